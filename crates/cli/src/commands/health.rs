//! Backend connectivity command.

use vitrine_client::{ConnectionState, HealthMonitor};

use super::{CliError, Context};

/// Passes a state through only when it differs from the last one passed.
#[derive(Debug, Default)]
struct Changes {
    last: ConnectionState,
}

impl Changes {
    fn accept(&mut self, state: ConnectionState) -> Option<ConnectionState> {
        let previous = std::mem::replace(&mut self.last, state);
        (previous != state).then_some(state)
    }
}

pub async fn check(ctx: &Context, watch: bool) -> Result<(), CliError> {
    if !watch {
        let result = ctx.client.health().await;
        let state = match &result {
            Ok(health) if health.is_up() => ConnectionState::Online,
            _ => ConnectionState::Offline,
        };
        println!("Backend {}: {state}", ctx.client.base_url());
        result?;
        return Ok(());
    }

    let mut monitor = HealthMonitor::spawn(ctx.client.clone(), ctx.config.polling.health);
    println!(
        "Verificando {} a cada {}s (Ctrl+C para sair)",
        ctx.client.base_url(),
        ctx.config.polling.health.as_secs()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut changes = Changes::default();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = monitor.changed() => match changed {
                Ok(state) => {
                    if let Some(state) = changes.accept(state) {
                        println!("{state}");
                    }
                }
                Err(_) => break,
            },
        }
    }

    monitor.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_state_is_reported_once() {
        use ConnectionState::{Offline, Online, Unknown};

        let mut changes = Changes::default();
        let reported: Vec<_> = [Online, Online, Online, Offline, Offline, Online]
            .into_iter()
            .filter_map(|state| changes.accept(state))
            .collect();

        assert_eq!(reported, vec![Online, Offline, Online]);
        assert_eq!(changes.accept(Unknown), Some(Unknown));
    }
}

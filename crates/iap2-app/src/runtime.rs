//! Generic runtime for application orchestration.
//!
//! The [`Runtime`] drives the event loop, coordinating between:
//! - [`App`]: the pure handshake/status-update state machine
//! - [`Driver`]: the platform-specific link, clock, and coprocessor

use crate::{App, AppAction, AppEvent, Driver, action::LogLevel, state::AccessoryIdentity};

/// Generic runtime that drives [`App`] off whatever [`Driver`] it is given.
pub struct Runtime<D: Driver> {
    driver: D,
    app: App,
}

impl<D: Driver> Runtime<D> {
    /// Creates a new runtime that will advertise `identity` once
    /// authenticated.
    pub fn new(driver: D, identity: AccessoryIdentity) -> Self {
        Self { driver, app: App::new(identity) }
    }

    /// Runs the event loop until the driver reports no further events.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        while let Some(event) = self.driver.poll_event().await? {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                break;
            }
        }
        self.driver.stop();
        Ok(())
    }

    /// Executes `actions`, returning `true` if the runtime should stop.
    async fn process_actions(&mut self, actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending = actions;
        while !pending.is_empty() {
            let actions = std::mem::take(&mut pending);
            for action in actions {
                match action {
                    AppAction::SendMessage(message) => self.driver.send_message(message).await?,
                    AppAction::RequestChallengeResponse(challenge) => {
                        let response = self.driver.challenge_response(challenge).await?;
                        pending.extend(self.app.handle(AppEvent::ChallengeResponseReady(response)));
                    }
                    AppAction::VehicleStatusChanged(update) => self.driver.report_vehicle_status(update),
                    AppAction::Log(level, message) => Self::log(level, &message),
                    AppAction::Disconnect => {
                        self.driver.stop();
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn log(level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "iap2_app", "{message}"),
            LogLevel::Info => tracing::info!(target: "iap2_app", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "iap2_app", "{message}"),
            LogLevel::Error => tracing::error!(target: "iap2_app", "{message}"),
        }
    }

    /// Reference to the underlying `App`, mostly useful for tests.
    pub fn app(&self) -> &App {
        &self.app
    }
}

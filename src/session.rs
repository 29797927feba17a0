//! Login state machine.
//!
//! ```text
//! Init → NavigatingLoginPage → CookieConsentHandled → EmailSubmitted → MfaMethodSelection
//!                                                                      ├─ none ──────────────┐
//!                                                                      └─ email OTP          │
//!                                   AwaitingOtpDelivery → OtpSubmitted → PostLoginRedirectCheck ⇄ SessionExpiredRecovery
//!                                                                                     └→ Authenticated
//! ```

use std::time::Duration;

use bon::Builder;
use rand::Rng;
use tokio::time::{Instant, sleep, sleep_until};

use crate::{
    browser::{Driver, poll_until},
    credentials::OtpSource,
    error::RunError,
    portal,
    prelude::*,
    timings::Timings,
};

/// Viewport size the browser is launched with.
pub const VIEWPORT: (u32, u32) = (1168, 687);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Mfa {
    None,
    EmailOtp,
}

#[derive(Debug)]
enum State {
    Init,
    NavigatingLoginPage,
    CookieConsentHandled,
    EmailSubmitted,
    MfaMethodSelection(Mfa),
    AwaitingOtpDelivery { deadline: Instant },
    OtpSubmitted { previous_url: String },
    PostLoginRedirectCheck { has_recovered: bool },
    SessionExpiredRecovery,
    Authenticated,
}

/// Driver that has been logged in to the portal.
pub struct Authenticated<'a, D>(&'a D);

impl<'a, D> Authenticated<'a, D> {
    pub const fn driver(&self) -> &'a D {
        self.0
    }

    /// Skip the login in tests.
    #[cfg(test)]
    pub const fn assume(driver: &'a D) -> Self {
        Self(driver)
    }
}

#[derive(Builder)]
pub struct Session<'a, D, O> {
    driver: &'a D,
    otp_source: &'a O,
    username: &'a str,
    timings: Timings,

    /// Wiggle the pointer while waiting for the code, it looks less like a robot.
    #[builder(default)]
    jiggle_pointer: bool,
}

impl<'a, D: Driver, O: OtpSource> Session<'a, D, O> {
    /// Drive the login flow until the dashboard is reachable.
    ///
    /// There is no retry: any failure ends the run, and the next run logs in from scratch.
    #[instrument(skip_all)]
    pub async fn login(self) -> Result<Authenticated<'a, D>> {
        let mut state = State::Init;
        loop {
            state = self.step(state).await?;
            info!(?state, "entered");
            if matches!(state, State::Authenticated) {
                return Ok(Authenticated(self.driver));
            }
        }
    }

    async fn step(&self, state: State) -> Result<State> {
        match state {
            State::Init => {
                self.driver.navigate(portal::ENTRY_URL).await?;
                Ok(State::NavigatingLoginPage)
            }

            State::NavigatingLoginPage => {
                if self.driver.is_present(portal::COOKIE_CONSENT).await? {
                    info!("accepting the cookies…");
                    self.driver.click(portal::COOKIE_CONSENT).await?;
                }
                Ok(State::CookieConsentHandled)
            }

            State::CookieConsentHandled => {
                self.require(portal::EMAIL_FIELD, self.timings.element_timeout).await?;
                self.driver.click(portal::EMAIL_FIELD).await?;
                self.driver.type_text(self.username).await?;
                self.driver.press_key("Enter").await?;
                Ok(State::EmailSubmitted)
            }

            State::EmailSubmitted => {
                let mfa = if self
                    .driver
                    .wait_for_selector(portal::MFA_EMAIL_OPTION, self.timings.mfa_timeout)
                    .await?
                {
                    Mfa::EmailOtp
                } else {
                    Mfa::None
                };
                Ok(State::MfaMethodSelection(mfa))
            }

            State::MfaMethodSelection(Mfa::None) => {
                info!("MFA is not required, waiting for the redirect…");
                self.leave_login_page().await?;
                Ok(State::PostLoginRedirectCheck { has_recovered: false })
            }

            State::MfaMethodSelection(Mfa::EmailOtp) => {
                self.driver.click(portal::MFA_EMAIL_OPTION).await?;
                if self.driver.is_present(portal::MFA_METHOD_SUBMIT).await? {
                    self.driver.click(portal::MFA_METHOD_SUBMIT).await?;
                } else {
                    debug!("no submit button, submitting the form directly");
                    self.driver.evaluate(&submit_form_script(portal::MFA_EMAIL_OPTION)?).await?;
                }
                Ok(State::AwaitingOtpDelivery { deadline: Instant::now() + self.timings.otp_delay })
            }

            State::AwaitingOtpDelivery { deadline } => {
                info!(delay = ?self.timings.otp_delay, "waiting for the code to be delivered…");
                if self.jiggle_pointer {
                    self.move_pointer_around().await?;
                }
                sleep_until(deadline).await;

                let otp = self.otp_source.get_otp().await?.ok_or_else(|| {
                    RunError::OtpUnavailable { entity_id: self.otp_source.id().to_owned() }
                })?;
                info!(?otp, "got the code");

                self.require(portal::OTP_FIELD, self.timings.element_timeout).await?;
                self.driver.click(portal::OTP_FIELD).await?;
                self.driver.type_text(otp.expose()).await?;
                let previous_url = self.driver.current_url().await?;
                self.driver.click(portal::OTP_SUBMIT).await?;
                Ok(State::OtpSubmitted { previous_url })
            }

            State::OtpSubmitted { previous_url } => {
                self.settle(&previous_url).await?;
                Ok(State::PostLoginRedirectCheck { has_recovered: false })
            }

            State::PostLoginRedirectCheck { has_recovered } => {
                let url = self.driver.current_url().await?;
                if url.starts_with(portal::SESSION_EXPIRED_URL) {
                    if has_recovered {
                        bail!(RunError::SessionExpiredUnrecovered);
                    }
                    warn!("the session has expired");
                    Ok(State::SessionExpiredRecovery)
                } else if url.contains(portal::LOGIN_URL_MARKER) {
                    Err(RunError::LoginFailed { url }.into())
                } else {
                    Ok(State::Authenticated)
                }
            }

            State::SessionExpiredRecovery => {
                self.require(portal::SESSION_EXPIRED_RECOVERY, self.timings.element_timeout).await?;
                let previous_url = self.driver.current_url().await?;
                self.driver.click(portal::SESSION_EXPIRED_RECOVERY).await?;
                self.settle(&previous_url).await?;
                Ok(State::PostLoginRedirectCheck { has_recovered: true })
            }

            State::Authenticated => Ok(State::Authenticated),
        }
    }

    async fn require(&self, selector: &str, timeout: Duration) -> Result {
        if self.driver.wait_for_selector(selector, timeout).await? {
            Ok(())
        } else {
            Err(RunError::ElementNotFound { selector: selector.to_owned(), timeout }.into())
        }
    }

    /// Wait for the page to leave the URL and finish loading the next one.
    ///
    /// Staying on the same URL is not an error here: the redirect check decides what it means.
    async fn settle(&self, previous_url: &str) -> Result {
        let driver = self.driver;
        let has_moved = poll_until(self.timings.navigation_timeout, || async move {
            Ok(driver.current_url().await? != previous_url)
        })
        .await?;
        if has_moved {
            self.driver.wait_for_navigation(self.timings.navigation_timeout).await
        } else {
            warn!(previous_url, "the page did not navigate");
            Ok(())
        }
    }

    /// Wait for the portal to take the page off the login host.
    ///
    /// Still being there after the timeout is left to the redirect check.
    async fn leave_login_page(&self) -> Result {
        let driver = self.driver;
        let has_left = poll_until(self.timings.navigation_timeout, || async move {
            Ok(!driver.current_url().await?.contains(portal::LOGIN_URL_MARKER))
        })
        .await?;
        if has_left {
            self.driver.wait_for_navigation(self.timings.navigation_timeout).await
        } else {
            warn!("the page is still on the login host");
            Ok(())
        }
    }

    async fn move_pointer_around(&self) -> Result {
        let points: Vec<(f64, f64)> = {
            let mut rng = rand::thread_rng();
            let n_points = rng.gen_range(3..=6);
            (0..n_points)
                .map(|_| {
                    (
                        rng.gen_range(0.0..f64::from(VIEWPORT.0)),
                        rng.gen_range(0.0..f64::from(VIEWPORT.1)),
                    )
                })
                .collect()
        };
        for (x, y) in points {
            self.driver.move_pointer(x, y).await?;
            sleep(Duration::from_millis(100)).await;
        }
        Ok(())
    }
}

fn submit_form_script(selector: &str) -> Result<String> {
    Ok(format!(
        "(() => {{ document.querySelector({}).form.requestSubmit(); return true; }})()",
        serde_json::to_string(selector)?,
    ))
}

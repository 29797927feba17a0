use tokio::time::sleep;

use crate::{
    browser::{Driver, poll_until},
    error::RunError,
    fluid::Fluid,
    portal::View,
    prelude::*,
    session::Authenticated,
    timings::Timings,
};

const SCROLL_SCRIPT: &str = "(() => { window.scrollBy(0, 300); return true; })()";

/// Clicks through the dashboard so that the application fetches and caches the consumptions.
///
/// It never reads anything itself.
pub struct Navigator<'a, D> {
    driver: &'a D,
    timings: Timings,

    /// The dashboard opens on electricity.
    current_fluid: Fluid,
}

impl<'a, D: Driver> Navigator<'a, D> {
    pub const fn new(page: &Authenticated<'a, D>, timings: Timings) -> Self {
        Self { driver: page.driver(), timings, current_fluid: Fluid::Electricity }
    }

    /// Scroll down until the consumption widget is rendered.
    #[instrument(skip_all)]
    pub async fn reveal_dashboard(&self) -> Result {
        let driver = self.driver;
        let selector = View::Day.selector();
        let is_revealed = poll_until(self.timings.element_timeout, || async move {
            if driver.is_present(selector).await? {
                return Ok(true);
            }
            driver.evaluate(SCROLL_SCRIPT).await?;
            Ok(false)
        })
        .await?;
        if is_revealed {
            info!("revealed");
            Ok(())
        } else {
            Err(RunError::ElementNotFound {
                selector: selector.to_owned(),
                timeout: self.timings.element_timeout,
            }
            .into())
        }
    }

    /// Switch to the fluid, if needed, and visit its full view cycle in order.
    #[instrument(skip_all, fields(fluid = %fluid))]
    pub async fn cycle(&mut self, fluid: Fluid) -> Result {
        if fluid != self.current_fluid {
            info!(from = %self.current_fluid, "switching the fluid…");
            self.click_and_settle(fluid.selector()).await?;
            self.current_fluid = fluid;
        }
        for view in fluid.view_cycle() {
            debug!(%view, "switching the view…");
            self.click_and_settle(view.selector()).await?;
        }
        info!("visited all the views");
        Ok(())
    }

    async fn click_and_settle(&self, selector: &str) -> Result {
        if !self.driver.wait_for_selector(selector, self.timings.element_timeout).await? {
            bail!(RunError::ElementNotFound {
                selector: selector.to_owned(),
                timeout: self.timings.element_timeout,
            });
        }
        self.driver.click(selector).await?;
        sleep(self.timings.settle_delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::scripted::ScriptedDriver;

    fn dashboard() -> ScriptedDriver {
        ScriptedDriver::default().with_present([
            View::Day.selector(),
            View::Month.selector(),
            View::Year.selector(),
            Fluid::Gas.selector(),
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_electricity_ok() -> Result {
        let driver = dashboard();
        let page = Authenticated::assume(&driver);
        Navigator::new(&page, Timings::default()).cycle(Fluid::Electricity).await?;
        assert_eq!(
            driver.clicks(),
            [
                View::Day.selector(),
                View::Month.selector(),
                View::Year.selector(),
                View::Day.selector(),
            ]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_switches_fluid_first() -> Result {
        let driver = dashboard();
        let page = Authenticated::assume(&driver);
        let mut navigator = Navigator::new(&page, Timings::default());
        navigator.cycle(Fluid::Electricity).await?;
        navigator.cycle(Fluid::Gas).await?;
        let clicks = driver.clicks();
        assert_eq!(clicks.len(), 9);
        assert_eq!(clicks[4], Fluid::Gas.selector());
        assert_eq!(clicks[5], View::Day.selector());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_missing_view_fails() {
        let driver = ScriptedDriver::default().with_present([View::Day.selector()]);
        let page = Authenticated::assume(&driver);
        let error = Navigator::new(&page, Timings::default())
            .cycle(Fluid::Electricity)
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<RunError>(),
            Some(RunError::ElementNotFound { selector, .. }) if selector == View::Month.selector(),
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_dashboard_ok() -> Result {
        let driver = dashboard();
        Navigator::new(&Authenticated::assume(&driver), Timings::default())
            .reveal_dashboard()
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_dashboard_times_out() {
        let driver = ScriptedDriver::default();
        let result = Navigator::new(&Authenticated::assume(&driver), Timings::default())
            .reveal_dashboard()
            .await;
        assert!(result.is_err());
    }
}

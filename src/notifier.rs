//! Public notifier handle.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use update_notifier::host::{Host, HttpFetcher, Prompt, Reloader};
//! use update_notifier::models::{HttpConfig, NotifierOptions};
//! use update_notifier::Notifier;
//!
//! # async fn run(prompt: Arc<dyn Prompt>, reloader: Arc<dyn Reloader>) -> update_notifier::error::Result<()> {
//! let fetcher = Arc::new(HttpFetcher::new(&HttpConfig::default())?);
//! let host = Host::new(fetcher, prompt, reloader);
//!
//! let notifier = Notifier::builder(NotifierOptions::new().manual(), host)
//!     .on_detected(|| log::info!("new build deployed"))
//!     .build();
//!
//! let updated = notifier.check_update().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::host::Host;
use crate::models::{Fingerprint, NotifierOptions};
use crate::pipeline::{Callbacks, Engine, Mode, Phase, resolve};
use crate::utils::trace;

/// Watches the reference document for a new build.
///
/// Dropping the notifier cancels its pending timer and visibility observer.
pub struct Notifier {
    engine: Arc<Engine>,
    visibility_task: Option<JoinHandle<()>>,
}

/// Builder attaching optional callbacks before the notifier starts.
pub struct NotifierBuilder {
    options: NotifierOptions,
    host: Host,
    callbacks: Callbacks,
}

impl NotifierBuilder {
    /// Reload decision used when `notify_type` is `custom`. May resolve
    /// immediately or after awaiting user interaction.
    pub fn on_update<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.callbacks = self.callbacks.on_update(callback);
        self
    }

    /// Called whenever an update is detected, before the reload decision.
    pub fn on_detected<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_detected(callback);
        self
    }

    /// Resolve the options and construct the notifier.
    ///
    /// In polling mode this wires the visibility observer (when pausing on
    /// hidden pages) and starts polling (when `immediate`). Both need a Tokio
    /// runtime; without one the notifier stays idle.
    pub fn build(self) -> Notifier {
        let config = resolve(&self.options);
        let mode = config.mode;
        let debug = config.debug;
        let engine = Engine::new(config, &self.host, self.callbacks);

        let visibility_task = match (&self.host.visibility, mode.pause_on_hidden()) {
            (Some(visibility), true) => engine.watch_visibility(visibility.clone()),
            _ => None,
        };

        if mode.immediate() {
            engine.start();
        }

        match mode.interval() {
            Some(interval) => trace::step(
                debug,
                format_args!("Polling mode enabled, interval {}ms", interval.as_millis()),
            ),
            None => trace::step(
                debug,
                format_args!("Manual mode enabled, call check_update() to check for updates"),
            ),
        }

        Notifier {
            engine,
            visibility_task,
        }
    }
}

/// Create a notifier without callbacks.
pub fn create_notifier(options: NotifierOptions, host: Host) -> Notifier {
    Notifier::builder(options, host).build()
}

impl Notifier {
    pub fn builder(options: NotifierOptions, host: Host) -> NotifierBuilder {
        NotifierBuilder {
            options,
            host,
            callbacks: Callbacks::default(),
        }
    }

    /// Begin automatic polling. Idempotent; no-op in manual mode.
    pub fn start(&self) {
        self.engine.start();
    }

    /// Cancel the pending check, if any.
    pub fn stop(&self) {
        self.engine.stop();
    }

    /// Check once without notifying. Returns whether an update was detected.
    pub async fn check_now(&self) -> bool {
        self.engine.check_now().await
    }

    /// Check once and, on an update, ask whether to reload.
    ///
    /// Returns whether an update was detected, whatever the decision. Errors
    /// only come from the update callback.
    pub async fn check_update(&self) -> Result<bool> {
        self.engine.check_update().await
    }

    /// Forget the baseline and stop polling.
    pub fn reset(&self) {
        self.engine.reset();
    }

    pub fn mode(&self) -> Mode {
        self.engine.config().mode
    }

    pub fn interval(&self) -> Option<Duration> {
        self.mode().interval()
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    /// Whether a check is armed or in flight.
    pub fn is_running(&self) -> bool {
        matches!(self.phase(), Phase::Armed | Phase::Running)
    }

    /// Fingerprint the next check is compared against.
    pub fn baseline(&self) -> Option<Fingerprint> {
        self.engine.baseline()
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        if let Some(task) = self.visibility_task.take() {
            task.abort();
        }
        self.engine.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::watch;

    use super::*;
    use crate::error::AppError;
    use crate::host::Visibility;
    use crate::models::NotifyType;
    use crate::testing::Fakes;

    fn polling(millis: u64) -> NotifierOptions {
        NotifierOptions::new().polling_interval(millis)
    }

    async fn sleep_ms(millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    #[tokio::test]
    async fn test_check_now_scenario() {
        let fakes = Fakes::new(&["a.js", "b.js"], false);
        let notifier = create_notifier(NotifierOptions::new().manual(), fakes.host());

        assert!(!notifier.check_now().await);
        assert!(!notifier.check_now().await);

        fakes.fetcher.serve(&["a.js", "c.js"]);
        assert!(notifier.check_now().await);
        assert_eq!(notifier.baseline(), Some(Fingerprint::from(["a.js", "c.js"])));
        assert!(fakes.prompt.messages().is_empty());
    }

    #[tokio::test]
    async fn test_growing_asset_list_is_an_update() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = create_notifier(NotifierOptions::new().manual(), fakes.host());

        assert!(!notifier.check_now().await);
        fakes.fetcher.serve(&["a.js", "b.js"]);
        assert!(notifier.check_now().await);
    }

    #[tokio::test]
    async fn test_check_update_prompts_and_reloads() {
        let fakes = Fakes::new(&["a.js"], true);
        let notifier = create_notifier(
            NotifierOptions::new().manual().prompt_message("new build!"),
            fakes.host(),
        );

        assert!(!notifier.check_update().await.unwrap());
        assert!(fakes.prompt.messages().is_empty());

        fakes.fetcher.serve(&["b.js"]);
        assert!(notifier.check_update().await.unwrap());
        assert_eq!(fakes.prompt.messages(), vec!["new build!".to_string()]);
        assert_eq!(fakes.reloader.count(), 1);
    }

    #[tokio::test]
    async fn test_check_update_reports_update_even_when_declined() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = create_notifier(NotifierOptions::new().manual(), fakes.host());

        notifier.check_update().await.unwrap();
        fakes.fetcher.serve(&["b.js"]);
        assert!(notifier.check_update().await.unwrap());
        assert_eq!(fakes.reloader.count(), 0);
    }

    #[tokio::test]
    async fn test_check_update_propagates_callback_error() {
        let fakes = Fakes::new(&["a.js"], true);
        let notifier = Notifier::builder(
            NotifierOptions::new().manual().notify_type(NotifyType::Custom),
            fakes.host(),
        )
        .on_update(|| async { Err(AppError::callback("dialog closed")) })
        .build();

        notifier.check_update().await.unwrap();
        fakes.fetcher.serve(&["b.js"]);
        assert!(matches!(
            notifier.check_update().await,
            Err(AppError::Callback(_))
        ));
        assert_eq!(fakes.reloader.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_mode_never_arms() {
        let fakes = Fakes::new(&["a.js"], false);
        let options = NotifierOptions::new()
            .manual()
            .immediate(true)
            .pause_on_hidden(true);
        let notifier = create_notifier(options, fakes.host());

        notifier.start();
        sleep_ms(60_000).await;
        assert_eq!(notifier.phase(), Phase::Idle);
        assert_eq!(fakes.fetcher.request_count(), 0);
        assert!(notifier.mode().is_manual());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_interval_and_immediate_start() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = create_notifier(NotifierOptions::default(), fakes.host());

        assert_eq!(notifier.interval(), Some(Duration::from_millis(10_000)));
        assert!(notifier.is_running());

        sleep_ms(9_000).await;
        assert_eq!(fakes.fetcher.request_count(), 0);
        sleep_ms(2_000).await;
        assert_eq!(fakes.fetcher.request_count(), 1);
        assert_eq!(notifier.baseline(), Some(Fingerprint::from(["a.js"])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_arms_one_cycle() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = create_notifier(polling(1_000).immediate(false), fakes.host());
        assert_eq!(notifier.phase(), Phase::Idle);

        notifier.start();
        notifier.start();
        sleep_ms(1_500).await;
        assert_eq!(fakes.fetcher.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_start_resumes() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = create_notifier(polling(1_000), fakes.host());

        sleep_ms(1_500).await;
        assert_eq!(fakes.fetcher.request_count(), 1);

        notifier.stop();
        assert_eq!(notifier.phase(), Phase::Idle);
        sleep_ms(5_000).await;
        assert_eq!(fakes.fetcher.request_count(), 1);

        notifier.start();
        sleep_ms(1_500).await;
        assert_eq!(fakes.fetcher.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_makes_next_extraction_the_baseline() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = create_notifier(polling(1_000), fakes.host());

        sleep_ms(1_500).await;
        assert!(notifier.baseline().is_some());

        notifier.reset();
        assert_eq!(notifier.baseline(), None);
        assert_eq!(notifier.phase(), Phase::Idle);

        fakes.fetcher.serve(&["b.js"]);
        assert!(!notifier.check_now().await);
        assert_eq!(notifier.baseline(), Some(Fingerprint::from(["b.js"])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_decline_rearms_without_reload() {
        let fakes = Fakes::new(&["a.js"], true);
        let decisions = Arc::new(AtomicUsize::new(0));
        let asked = Arc::clone(&decisions);
        let notifier = Notifier::builder(
            polling(1_000).notify_type(NotifyType::Custom),
            fakes.host(),
        )
        .on_update(move || {
            asked.fetch_add(1, Ordering::SeqCst);
            async { Ok(false) }
        })
        .build();

        sleep_ms(1_500).await;
        fakes.fetcher.serve(&["b.js"]);
        sleep_ms(1_000).await;

        assert_eq!(decisions.load(Ordering::SeqCst), 1);
        assert_eq!(fakes.reloader.count(), 0);
        assert!(fakes.prompt.messages().is_empty());
        assert_eq!(notifier.phase(), Phase::Armed);

        sleep_ms(1_000).await;
        assert_eq!(fakes.fetcher.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_time_excluded_from_interval() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = Notifier::builder(
            polling(1_000).notify_type(NotifyType::Custom),
            fakes.host(),
        )
        .on_update(|| async {
            tokio::time::sleep(Duration::from_millis(5_000)).await;
            Ok(false)
        })
        .build();

        // t=1000 baseline, t=2000 update + 5s decision, next check at t=8000.
        sleep_ms(1_500).await;
        fakes.fetcher.serve(&["b.js"]);
        sleep_ms(6_000).await;
        assert_eq!(fakes.fetcher.request_count(), 2);
        assert_eq!(notifier.phase(), Phase::Armed);

        sleep_ms(1_000).await;
        assert_eq!(fakes.fetcher.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_error_breaks_the_chain() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = Notifier::builder(
            polling(1_000).notify_type(NotifyType::Custom),
            fakes.host(),
        )
        .on_update(|| async { Err(AppError::callback("boom")) })
        .build();

        sleep_ms(1_500).await;
        fakes.fetcher.serve(&["b.js"]);
        sleep_ms(5_000).await;

        assert_eq!(fakes.fetcher.request_count(), 2);
        assert_eq!(notifier.phase(), Phase::Idle);

        notifier.start();
        assert!(notifier.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_while_idle_then_visible_resumes() {
        let fakes = Fakes::new(&["a.js"], false);
        let (visibility, rx) = watch::channel(Visibility::Visible);
        let notifier = create_notifier(
            polling(1_000).immediate(false),
            fakes.host().with_visibility(rx),
        );

        visibility.send(Visibility::Hidden).unwrap();
        sleep_ms(10).await;
        notifier.start();
        assert_eq!(notifier.phase(), Phase::Hidden);

        sleep_ms(5_000).await;
        assert_eq!(fakes.fetcher.request_count(), 0);

        visibility.send(Visibility::Visible).unwrap();
        sleep_ms(10).await;
        assert_eq!(notifier.phase(), Phase::Armed);

        sleep_ms(1_000).await;
        assert_eq!(fakes.fetcher.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_hidden_when_page_is_hidden() {
        let fakes = Fakes::new(&["a.js"], false);
        let (visibility, rx) = watch::channel(Visibility::Hidden);
        let notifier = create_notifier(polling(1_000), fakes.host().with_visibility(rx));

        assert_eq!(notifier.phase(), Phase::Hidden);

        visibility.send(Visibility::Visible).unwrap();
        sleep_ms(1_500).await;
        assert_eq!(fakes.fetcher.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_in_flight_check_does_not_rearm() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = Notifier::builder(
            polling(1_000).notify_type(NotifyType::Custom),
            fakes.host(),
        )
        .on_update(|| async {
            tokio::time::sleep(Duration::from_millis(2_000)).await;
            Ok(false)
        })
        .build();

        sleep_ms(1_500).await;
        fakes.fetcher.serve(&["b.js"]);
        // The second check starts at t=2000 and waits on the callback.
        sleep_ms(1_000).await;
        assert_eq!(notifier.phase(), Phase::Running);

        notifier.stop();
        sleep_ms(10_000).await;

        // The in-flight check completed its diff but scheduled nothing.
        assert_eq!(notifier.baseline(), Some(Fingerprint::from(["b.js"])));
        assert_eq!(fakes.fetcher.request_count(), 2);
        assert_eq!(notifier.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_in_flight_is_ignored() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = Notifier::builder(
            polling(1_000).notify_type(NotifyType::Custom),
            fakes.host(),
        )
        .on_update(|| async {
            tokio::time::sleep(Duration::from_millis(3_000)).await;
            Ok(false)
        })
        .build();

        sleep_ms(1_500).await;
        fakes.fetcher.serve(&["b.js"]);
        sleep_ms(1_000).await;
        notifier.start();

        // Still a single chain: t=2000 check, decision at t=5000, next at t=6000.
        sleep_ms(3_000).await;
        assert_eq!(fakes.fetcher.request_count(), 2);
        sleep_ms(1_000).await;
        assert_eq!(fakes.fetcher.request_count(), 3);
    }

    fn slow_decision(fakes: &Fakes, answer: bool) -> Arc<Notifier> {
        let notifier = Notifier::builder(
            polling(1_000).notify_type(NotifyType::Custom),
            fakes.host(),
        )
        .on_update(move || async move {
            tokio::time::sleep(Duration::from_millis(3_000)).await;
            Ok(answer)
        })
        .build();
        Arc::new(notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_from_manual_check_cancels_queued_cycle() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = slow_decision(&fakes, true);

        // t=1000 baseline; manual check at t=1500 holds the guard until t=4500.
        sleep_ms(1_500).await;
        fakes.fetcher.serve(&["b.js"]);
        let manual = Arc::clone(&notifier);
        let check = tokio::spawn(async move { manual.check_update().await });

        // The timer fires at t=2000 and queues behind the manual check.
        sleep_ms(600).await;
        assert_eq!(notifier.phase(), Phase::Running);
        fakes.fetcher.serve(&["c.js"]);

        assert!(check.await.unwrap().unwrap());
        sleep_ms(10_000).await;

        assert_eq!(fakes.reloader.count(), 1);
        assert_eq!(fakes.fetcher.request_count(), 2);
        assert_eq!(notifier.phase(), Phase::Reloaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_cycle_queued_behind_manual_check() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = slow_decision(&fakes, false);

        sleep_ms(1_500).await;
        fakes.fetcher.serve(&["b.js"]);
        let manual = Arc::clone(&notifier);
        let check = tokio::spawn(async move { manual.check_update().await });

        sleep_ms(600).await;
        assert_eq!(notifier.phase(), Phase::Running);
        notifier.stop();

        assert!(check.await.unwrap().unwrap());
        sleep_ms(10_000).await;

        assert_eq!(fakes.reloader.count(), 0);
        assert_eq!(fakes.fetcher.request_count(), 2);
        assert_eq!(notifier.phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_polling() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = create_notifier(polling(1_000), fakes.host());
        drop(notifier);

        sleep_ms(5_000).await;
        assert_eq!(fakes.fetcher.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_amplifies_into_update_on_recovery() {
        let fakes = Fakes::new(&["a.js"], false);
        let notifier = create_notifier(NotifierOptions::new().manual(), fakes.host());

        assert!(!notifier.check_now().await);
        fakes.fetcher.replace([Err("503")]);
        assert!(notifier.check_now().await);
        assert_eq!(notifier.baseline(), Some(Fingerprint::default()));

        fakes.fetcher.serve(&["a.js"]);
        assert!(notifier.check_now().await);
    }
}

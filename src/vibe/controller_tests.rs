#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::client::{MockVibeGateway, VibeGateway};
    use crate::config::TickerConfig;
    use crate::error::{BACKEND_UNAVAILABLE_MESSAGE, VibeError};
    use crate::models::{AnalysisResult, PlaylistSummary, QuantitativeSummary, TokenPair};
    use crate::session::{Credential, Session};
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::Receiver;
    use std::thread;
    use std::time::Duration;

    /// How a fake backend answers for one playlist
    #[derive(Clone)]
    struct Script {
        delay: Duration,
        outcome: Result<AnalysisResult, VibeError>,
    }

    /// Gateway that answers per playlist after a fixed delay
    struct ScriptedGateway {
        backend_up: bool,
        crashes: HashSet<String>,
        scripts: HashMap<String, Script>,
        analysis_calls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new() -> Self {
            ScriptedGateway {
                backend_up: true,
                crashes: HashSet::new(),
                scripts: HashMap::new(),
                analysis_calls: AtomicUsize::new(0),
            }
        }

        fn answer(mut self, playlist_id: &str, delay_ms: u64, outcome: Result<AnalysisResult, VibeError>) -> Self {
            self.scripts.insert(
                playlist_id.to_string(),
                Script {
                    delay: Duration::from_millis(delay_ms),
                    outcome,
                },
            );
            self
        }

        fn crash_on(mut self, playlist_id: &str) -> Self {
            self.crashes.insert(playlist_id.to_string());
            self
        }
    }

    impl VibeGateway for ScriptedGateway {
        fn list_playlists(&self, _credential: &Credential) -> Result<Vec<PlaylistSummary>, VibeError> {
            Ok(Vec::new())
        }

        fn probe_backend(&self) -> bool {
            self.backend_up
        }

        fn request_analysis(
            &self,
            _credential: &Credential,
            playlist_id: &str,
        ) -> Result<AnalysisResult, VibeError> {
            self.analysis_calls.fetch_add(1, Ordering::SeqCst);
            if self.crashes.contains(playlist_id) {
                panic!("gateway crashed on {playlist_id}");
            }
            let script = self
                .scripts
                .get(playlist_id)
                .cloned()
                .unwrap_or_else(|| panic!("no script for {playlist_id}"));
            thread::sleep(script.delay);
            script.outcome
        }

        fn exchange_token(&self, _code: &str) -> Result<TokenPair, VibeError> {
            Err(VibeError::Network("not scripted".to_string()))
        }
    }

    fn create_result(name: &str) -> AnalysisResult {
        AnalysisResult {
            playlist_name: name.to_string(),
            quantitative: QuantitativeSummary {
                track_count: 10,
                artists_count: 8,
                ..Default::default()
            },
            narrative_report: format!("{name} has a vibe"),
            metadata: Default::default(),
        }
    }

    fn fast_ticker() -> TickerConfig {
        TickerConfig {
            interval: Duration::from_millis(5),
            step: 5,
        }
    }

    fn controller_with<G>(gateway: G) -> AnalysisController<G>
    where
        G: VibeGateway + Send + Sync + 'static,
    {
        AnalysisController::new(Arc::new(gateway), Session::with_token("token"), fast_ticker())
    }

    fn drain(rx: &Receiver<LifecycleState>) -> Vec<LifecycleState> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_successful_analysis() {
        let controller = controller_with(ScriptedGateway::new().answer("p1", 20, Ok(create_result("Road Trip"))));
        let rx = controller.subscribe();

        let handle = controller.start_analysis("p1").unwrap();
        assert_eq!(controller.analyzing_playlist_id().as_deref(), Some("p1"));
        handle.wait();

        match controller.state() {
            LifecycleState::Succeeded { result } => assert_eq!(result.playlist_name, "Road Trip"),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(controller.analyzing_playlist_id(), None);

        // Progress is forced to 100 right before the result lands
        let states = drain(&rx);
        assert_eq!(states.first(), Some(&LifecycleState::requesting("p1")));
        let before_last = &states[states.len() - 2];
        assert!(matches!(before_last, LifecycleState::Requesting { progress: 100, step: 3, .. }));
    }

    #[test]
    fn test_missing_credential_fails_without_state_change() {
        let mut gateway = MockVibeGateway::new();
        gateway.expect_probe_backend().never();
        gateway.expect_request_analysis().never();
        let controller = AnalysisController::new(Arc::new(gateway), Session::new(), fast_ticker());

        let err = controller.start_analysis("p1").err().unwrap();

        assert!(matches!(err, VibeError::Auth(_)));
        assert_eq!(controller.state(), LifecycleState::Idle);
        assert_eq!(controller.analyzing_playlist_id(), None);
    }

    #[test]
    fn test_probe_failure_skips_analysis_request() {
        let mut gateway = MockVibeGateway::new();
        gateway.expect_probe_backend().times(1).return_const(false);
        gateway.expect_request_analysis().never();
        let controller = controller_with(gateway);

        controller.start_analysis("p1").unwrap().wait();

        assert_eq!(
            controller.state(),
            LifecycleState::Failed {
                message: BACKEND_UNAVAILABLE_MESSAGE.to_string()
            }
        );
        assert_eq!(controller.analyzing_playlist_id(), None);
    }

    #[test]
    fn test_http_error_detail_becomes_failure_message() {
        let mut gateway = MockVibeGateway::new();
        gateway.expect_probe_backend().return_const(true);
        gateway
            .expect_request_analysis()
            .withf(|credential, playlist_id| credential.token() == "token" && playlist_id == "p1")
            .times(1)
            .returning(|_, _| {
                Err(VibeError::Http {
                    status: 500,
                    detail: "rate limited".to_string(),
                })
            });
        let controller = controller_with(gateway);

        controller.start_analysis("p1").unwrap().wait();

        assert_eq!(
            controller.state(),
            LifecycleState::Failed {
                message: "rate limited".to_string()
            }
        );
    }

    #[test]
    fn test_ticker_reaches_100_and_stops() {
        // 20 ticks of 5ms reach 100 well before the call returns
        let controller =
            controller_with(ScriptedGateway::new().answer("slow", 300, Ok(create_result("Slow"))));
        let rx = controller.subscribe();

        controller.start_analysis("slow").unwrap().wait();
        let states = drain(&rx);

        let progress: Vec<u8> = states
            .iter()
            .filter_map(|s| match s {
                LifecycleState::Requesting { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();

        assert!(progress.iter().all(|p| *p <= 100));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        // 0, then 21 ticks at most (20 to reach 100), then the forced 100
        assert!(progress.len() <= 22, "ticker kept going: {progress:?}");
        assert!(states.last().unwrap().is_terminal());
    }

    #[test]
    fn test_no_ticks_after_resolution() {
        let controller = controller_with(ScriptedGateway::new().answer("p1", 30, Ok(create_result("Quick"))));
        let rx = controller.subscribe();

        controller.start_analysis("p1").unwrap().wait();
        let settled = controller.state();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(controller.state(), settled);
        assert!(drain(&rx).last().unwrap().is_terminal());
    }

    #[test]
    fn test_second_start_supersedes_first() {
        let gateway = ScriptedGateway::new()
            .answer("first", 200, Ok(create_result("First")))
            .answer("second", 20, Ok(create_result("Second")));
        let controller = controller_with(gateway);

        let first = controller.start_analysis("first").unwrap();
        let second = controller.start_analysis("second").unwrap();
        assert!(second.call_id() > first.call_id());
        assert_eq!(controller.analyzing_playlist_id().as_deref(), Some("second"));

        second.wait();
        first.wait();

        match controller.state() {
            LifecycleState::Succeeded { result } => assert_eq!(result.playlist_name, "Second"),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(controller.analyzing_playlist_id(), None);
    }

    #[test]
    fn test_stale_failure_does_not_overwrite_newer_success() {
        let gateway = ScriptedGateway::new()
            .answer(
                "first",
                150,
                Err(VibeError::Http {
                    status: 502,
                    detail: "stale".to_string(),
                }),
            )
            .answer("second", 10, Ok(create_result("Second")));
        let controller = controller_with(gateway);
        let rx = controller.subscribe();

        let first = controller.start_analysis("first").unwrap();
        let second = controller.start_analysis("second").unwrap();
        second.wait();
        first.wait();

        let terminal: Vec<LifecycleState> = drain(&rx).into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(&terminal[0], LifecycleState::Succeeded { result } if result.playlist_name == "Second"));
    }

    #[test]
    fn test_clear_result_is_noop_while_requesting() {
        let gateway = ScriptedGateway::new().answer("p1", 100, Ok(create_result("Later")));
        let controller = controller_with(gateway);

        let handle = controller.start_analysis("p1").unwrap();
        assert!(!handle.is_finished());
        controller.clear_result();
        assert!(controller.state().is_requesting());

        handle.wait();
        assert!(controller.state().is_terminal());

        controller.clear_result();
        assert_eq!(controller.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_clear_result_after_failure() {
        let mut gateway = MockVibeGateway::new();
        gateway.expect_probe_backend().return_const(false);
        let controller = controller_with(gateway);

        controller.start_analysis("p1").unwrap().wait();
        assert!(matches!(controller.state(), LifecycleState::Failed { .. }));

        controller.clear_result();
        assert_eq!(controller.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_logout_blocks_new_analyses() {
        let session = Session::with_token("token");
        let gateway = ScriptedGateway::new().answer("p1", 5, Ok(create_result("One")));
        let controller = AnalysisController::new(Arc::new(gateway), session.clone(), fast_ticker());

        controller.start_analysis("p1").unwrap().wait();
        session.logout();

        assert!(matches!(controller.start_analysis("p1"), Err(VibeError::Auth(_))));
        assert!(matches!(controller.state(), LifecycleState::Succeeded { .. }));
    }

    #[test]
    fn test_repeat_analysis_calls_backend_each_time() {
        let gateway = Arc::new(ScriptedGateway::new().answer("p1", 1, Ok(create_result("One"))));
        let controller = AnalysisController::new(Arc::clone(&gateway), Session::with_token("t"), fast_ticker());

        controller.start_analysis("p1").unwrap().wait();
        controller.start_analysis("p1").unwrap().wait();

        assert_eq!(gateway.analysis_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_gateway_panic_still_reaches_failed_state() {
        let controller = controller_with(ScriptedGateway::new().crash_on("p1"));
        let rx = controller.subscribe();

        controller.start_analysis("p1").unwrap().wait();

        assert_eq!(
            controller.state(),
            LifecycleState::Failed {
                message: ANALYSIS_CRASHED_MESSAGE.to_string()
            }
        );
        assert_eq!(controller.analyzing_playlist_id(), None);
        assert!(drain(&rx).last().unwrap().is_terminal());

        // The controller stays usable afterwards
        controller.clear_result();
        assert_eq!(controller.state(), LifecycleState::Idle);
    }
}

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for the console's request pipeline and session transitions.
#[derive(Clone)]
pub struct ConsoleMetrics {
    pub registry: Registry,
    requests_total: IntCounterVec,
    forced_logouts_total: IntCounter,
    login_attempts_total: IntCounterVec,
    session_transitions_total: IntCounterVec,
}

impl ConsoleMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "console_requests_total",
                "Outbound console requests grouped by method and outcome",
            ),
            &["method", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let forced_logouts_total = IntCounter::new(
            "console_forced_logouts_total",
            "Sessions torn down because the server answered 401",
        )?;
        registry.register(Box::new(forced_logouts_total.clone()))?;

        let login_attempts_total = IntCounterVec::new(
            Opts::new(
                "console_login_attempts_total",
                "Login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(login_attempts_total.clone()))?;

        let session_transitions_total = IntCounterVec::new(
            Opts::new(
                "console_session_transitions_total",
                "Session state transitions grouped by target state",
            ),
            &["state"],
        )?;
        registry.register(Box::new(session_transitions_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            forced_logouts_total,
            login_attempts_total,
            session_transitions_total,
        })
    }

    pub fn request(&self, method: &str, outcome: &str) {
        self.requests_total.with_label_values(&[method, outcome]).inc();
    }

    pub fn forced_logout(&self) {
        self.forced_logouts_total.inc();
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts_total.with_label_values(&[outcome]).inc();
    }

    pub fn session_transition(&self, state: &str) {
        self.session_transitions_total.with_label_values(&[state]).inc();
    }

    pub fn forced_logouts(&self) -> u64 {
        self.forced_logouts_total.get()
    }

    pub fn requests(&self, method: &str, outcome: &str) -> u64 {
        self.requests_total.with_label_values(&[method, outcome]).get()
    }

    /// Text exposition of every registered counter.
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = ConsoleMetrics::new().expect("metrics");
        metrics.request("GET", "success");
        metrics.forced_logout();
        metrics.login_attempt("rejected");
        metrics.session_transition("anonymous");

        assert_eq!(metrics.requests("GET", "success"), 1);
        assert_eq!(metrics.forced_logouts(), 1);

        let text = metrics.render().expect("render");
        assert!(text.contains("console_requests_total"));
        assert!(text.contains("console_forced_logouts_total 1"));
        assert!(text.contains("console_login_attempts_total{outcome=\"rejected\"} 1"));
    }
}

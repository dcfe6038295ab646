use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Tellere for analysepipelinen. Eies av kalleren og sendes inn eksplisitt;
/// biblioteket har ingen global registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    sessions: IntCounter,
    reps: IntCounter,
    strategy: IntCounterVec,
    insufficient_fatigue: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let sessions = IntCounter::new("liftgraph_sessions_total", "Analysed sessions")?;
        let reps = IntCounter::new("liftgraph_reps_total", "Segmented reps")?;
        let strategy = IntCounterVec::new(
            Opts::new(
                "liftgraph_segmentation_strategy_total",
                "Sessions per segmentation strategy",
            ),
            &["strategy"],
        )?;
        let insufficient_fatigue = IntCounter::new(
            "liftgraph_insufficient_fatigue_total",
            "Sessions with too few reps for fatigue analysis",
        )?;

        registry.register(Box::new(sessions.clone()))?;
        registry.register(Box::new(reps.clone()))?;
        registry.register(Box::new(strategy.clone()))?;
        registry.register(Box::new(insufficient_fatigue.clone()))?;

        Ok(Self { registry, sessions, reps, strategy, insufficient_fatigue })
    }

    /// Registrerer én ferdig analysert økt.
    pub fn record_session(&self, strategy: &str, reps: usize, fatigue_insufficient: bool) {
        self.sessions.inc();
        self.reps.inc_by(reps as u64);
        self.strategy.with_label_values(&[strategy]).inc();
        if fatigue_insufficient {
            self.insufficient_fatigue.inc();
        }
    }

    pub fn sessions_total(&self) -> u64 {
        self.sessions.get()
    }

    pub fn reps_total(&self) -> u64 {
        self.reps.get()
    }

    pub fn strategy_total(&self, strategy: &str) -> u64 {
        self.strategy.with_label_values(&[strategy]).get()
    }

    pub fn insufficient_fatigue_total(&self) -> u64 {
        self.insufficient_fatigue.get()
    }

    /// Prometheus tekstformat.
    pub fn gather_text(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            log::warn!("metrics: encode failed: {}", e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

//! Job progress sinks

/// Receives every progress line of a job, already prefixed with the
/// client id (`[abcd] Calculating catchment`).
pub trait JobLog: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> JobLog for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink() {
        let lines = Mutex::new(Vec::new());
        let sink = |line: &str| lines.lock().unwrap().push(line.to_string());
        let log: &dyn JobLog = &sink;
        log.log("[ab12] Done!");
        assert_eq!(lines.into_inner().unwrap(), vec!["[ab12] Done!"]);
    }
}

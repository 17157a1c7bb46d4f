use crate::constants::env;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    fn from_env() -> Self {
        std::env::var(env::LOG_LEVEL)
            .or_else(|_| std::env::var(env::LOG_LEVEL_FALLBACK))
            .ok()
            .and_then(|raw| LogLevel::parse(&raw))
            .unwrap_or(LogLevel::Info)
    }

    fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub context: String,
    pub message: String,
    pub meta: Option<Value>,
}

#[derive(Debug, Clone)]
enum Sink {
    Stderr,
    Memory(Arc<Mutex<Vec<LogRecord>>>),
}

#[derive(Debug, Default)]
struct Counters {
    error: u64,
    warn: u64,
    info: u64,
    debug: u64,
}

#[derive(Debug, Clone)]
pub struct Logger {
    context: String,
    level: LogLevel,
    sink: Sink,
    counters: Arc<Mutex<Counters>>,
}

impl Logger {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
            level: LogLevel::from_env(),
            sink: Sink::Stderr,
            counters: Arc::new(Mutex::new(Counters::default())),
        }
    }

    pub fn in_memory(context: &str) -> Self {
        Self {
            context: context.to_string(),
            level: LogLevel::Debug,
            sink: Sink::Memory(Arc::new(Mutex::new(Vec::new()))),
            counters: Arc::new(Mutex::new(Counters::default())),
        }
    }

    pub fn child(&self, suffix: &str) -> Self {
        let context = if suffix.is_empty() {
            self.context.clone()
        } else {
            format!("{}:{}", self.context, suffix)
        };
        Self {
            context,
            level: self.level,
            sink: self.sink.clone(),
            counters: self.counters.clone(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    fn log(&self, level: LogLevel, message: &str, meta: Option<&Value>) {
        if level > self.level {
            return;
        }
        if let Ok(mut counters) = self.counters.lock() {
            match level {
                LogLevel::Error => counters.error += 1,
                LogLevel::Warn => counters.warn += 1,
                LogLevel::Info => counters.info += 1,
                LogLevel::Debug => counters.debug += 1,
            }
        }
        let meta = meta.filter(|m| !m.is_null());
        match &self.sink {
            Sink::Stderr => {
                let timestamp = chrono::Utc::now().to_rfc3339();
                let meta_suffix = meta.map(|m| format!(" {}", m)).unwrap_or_default();
                eprintln!(
                    "[{}] {} [{}] {}{}",
                    timestamp,
                    level.label(),
                    self.context,
                    message,
                    meta_suffix
                );
            }
            Sink::Memory(records) => {
                if let Ok(mut records) = records.lock() {
                    records.push(LogRecord {
                        level,
                        context: self.context.clone(),
                        message: message.to_string(),
                        meta: meta.cloned(),
                    });
                }
            }
        }
    }

    pub fn error(&self, message: &str, meta: Option<&Value>) {
        self.log(LogLevel::Error, message, meta);
    }

    pub fn warn(&self, message: &str, meta: Option<&Value>) {
        self.log(LogLevel::Warn, message, meta);
    }

    pub fn info(&self, message: &str, meta: Option<&Value>) {
        self.log(LogLevel::Info, message, meta);
    }

    pub fn debug(&self, message: &str, meta: Option<&Value>) {
        self.log(LogLevel::Debug, message, meta);
    }

    pub fn records(&self) -> Vec<LogRecord> {
        match &self.sink {
            Sink::Memory(records) => records
                .lock()
                .map(|guard| guard.clone())
                .unwrap_or_default(),
            Sink::Stderr => Vec::new(),
        }
    }

    pub fn stats(&self) -> Value {
        let counters = self.counters.lock().unwrap_or_else(|err| err.into_inner());
        serde_json::json!({
            "level": format!("{:?}", self.level).to_lowercase(),
            "context": self.context,
            "error": counters.error,
            "warn": counters.warn,
            "info": counters.info,
            "debug": counters.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLevel, Logger};

    #[test]
    fn child_contexts_share_sink_and_counters() {
        let root = Logger::in_memory("routecall");
        let child = root.child("executor");
        child.warn("HTTP retry", Some(&serde_json::json!({"retry": 1})));
        root.info("done", None);

        let records = root.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].context, "routecall:executor");
        assert_eq!(records[0].level, LogLevel::Warn);
        assert_eq!(root.stats()["warn"], 1);
        assert_eq!(root.stats()["info"], 1);
    }

    #[test]
    fn level_filters_verbose_records() {
        let logger = Logger::in_memory("test").with_level(LogLevel::Warn);
        logger.debug("hidden", None);
        logger.error("shown", None);
        assert_eq!(logger.records().len(), 1);
    }

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" debug "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("verbose"), None);
    }
}

//! Structured logging and telemetry for the routing core
//!
//! Diagnostics go through `tracing`. Routing decisions and model-gateway
//! attempts are additionally emitted as [`TelemetryEvent`]s to an
//! [`EventSink`], one event per decision and one per attempt.

pub mod events;
pub mod fields;

pub use events::{
    EventSink, GatewayEvent, GatewayOutcome, MemorySink, MultiSink, RoutingEvent, TelemetryEvent,
    TracingSink,
};
pub use fields::{message_preview, truncate_chars};

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
///
/// # Examples
///
/// ```
/// use helpdesk::config::{LogFormat, LoggingConfig};
/// use helpdesk::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("gateway".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
///     enable_content_logging: false,
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,helpdesk::gateway=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",helpdesk::{}={}", component, level));
        }
    }

    filter_str
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use std::collections::HashMap;

    #[test]
    fn test_filter_directives_base_level_only() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn test_filter_directives_components_sorted() {
        let mut levels = HashMap::new();
        levels.insert("router".to_string(), "trace".to_string());
        levels.insert("extract".to_string(), "debug".to_string());
        let config = LoggingConfig {
            component_levels: Some(levels),
            ..Default::default()
        };
        assert_eq!(
            build_filter_directives(&config),
            "info,helpdesk::extract=debug,helpdesk::router=trace"
        );
    }
}

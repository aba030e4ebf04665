//! Integration tests for config

#[cfg(test)]
mod tests {
    use sdkpack_config::constants::DEFAULT_WINDOW_SIZE;
    use sdkpack_config::*;
    use sdkpack_errors::{ConfigError, Error};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            "SDKPACK_WINDOW_SIZE",
            "SDKPACK_DEADLINE_SECS",
            "SDKPACK_ASSETS_PATH",
            "SDKPACK_TOOL_BINARY",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.transfer.window_size, DEFAULT_WINDOW_SIZE as i64);
        assert_eq!(config.transfer.deadline(), Duration::from_secs(60));
        assert_eq!(config.transfer.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.paths.tmp_dir_name, "_tmp");
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[transfer]
window_size = 4096
deadline_secs = 30

[paths]
assets_path = "/srv/assets"
tool_binary = "/srv/bin/kbcmd"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.transfer.window_size, 4096);
        assert_eq!(config.transfer.deadline_secs, 30);
        assert_eq!(config.transfer.poll_interval_ms, 100);
        assert_eq!(config.assets_path().unwrap(), PathBuf::from("/srv/assets"));
        assert_eq!(config.tool_binary().unwrap(), PathBuf::from("/srv/bin/kbcmd"));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[transfer\nwindow_size = ").unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ParseError { .. })));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let err = Config::load_from_file(std::path::Path::new("/nonexistent/sdkpack.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_zero_deadline_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[transfer]\ndeadline_secs = 0").unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { ref field, .. }) if field == "transfer.deadline_secs"
        ));
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut config = Config::default();
        config.transfer.tick_interval_ms = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { ref field, ref value })
                if field == "transfer.tick_interval_ms" && value == "0"
        ));
    }

    #[tokio::test]
    async fn test_zero_tick_in_file_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[transfer]\ntick_interval_ms = 0").unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { ref field, .. }) if field == "transfer.tick_interval_ms"
        ));
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("SDKPACK_WINDOW_SIZE", "-5");
        std::env::set_var("SDKPACK_ASSETS_PATH", "/data/assets");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.transfer.window_size, -5);
        assert_eq!(config.assets_path().unwrap(), PathBuf::from("/data/assets"));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("SDKPACK_DEADLINE_SECS", "soon");

        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
    }

    #[test]
    fn test_missing_tool_binary() {
        let config = Config::default();
        let err = config.tool_binary().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::MissingField { .. })));
    }
}

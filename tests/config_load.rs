// tests/config_load.rs
use serial_test::serial;
use std::{env, fs};

use crypto_event_calendar::config::calendar::{CalendarConfig, ENV_CONFIG_PATH};
use crypto_event_calendar::Source;

#[test]
#[serial]
fn env_path_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calendar.toml");
    fs::write(
        &path,
        r#"
        cache_path = "/tmp/cal/events.json"
        refresh_interval_minutes = 15

        [telegram]
        bot_token = "123:abc"
        chat_id = "-10042"

        [schedule]
        digest_weekday = "fri"
        digest_time_utc = "18:30"

        [[feeds]]
        source = "binance"
        path = "fixtures/binance.json"
        "#,
    )
    .unwrap();

    env::set_var(ENV_CONFIG_PATH, &path);
    let cfg = CalendarConfig::load_default();
    env::remove_var(ENV_CONFIG_PATH);

    let cfg = cfg.unwrap();
    assert_eq!(cfg.refresh_interval_minutes, 15);
    assert!(cfg.telegram.is_configured());
    assert_eq!(cfg.feeds[0].source, Source::Binance);
    assert!(cfg.digest_schedule().is_ok());
}

#[test]
#[serial]
fn env_path_must_exist() {
    env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/calendar.toml");
    let res = CalendarConfig::load_default();
    env::remove_var(ENV_CONFIG_PATH);
    assert!(res.is_err());
}

#[test]
#[serial]
fn env_marker_resolves_telegram_credentials() {
    env::set_var("TELEGRAM_BOT_TOKEN", "999:xyz");
    env::set_var("TELEGRAM_CHAT_ID", "-1001");
    let cfg = CalendarConfig::from_toml_str(
        "[telegram]\nbot_token = \"ENV\"\nchat_id = \"ENV\"\n",
    );
    env::remove_var("TELEGRAM_BOT_TOKEN");
    env::remove_var("TELEGRAM_CHAT_ID");

    let cfg = cfg.unwrap();
    assert_eq!(cfg.telegram.bot_token, "999:xyz");
    assert_eq!(cfg.telegram.chat_id, "-1001");
}

#[test]
#[serial]
fn env_marker_without_variable_leaves_telegram_unconfigured() {
    env::remove_var("TELEGRAM_BOT_TOKEN");
    env::set_var("TELEGRAM_CHAT_ID", "  ");
    let cfg = CalendarConfig::from_toml_str(
        "[telegram]\nbot_token = \"ENV\"\nchat_id = \"ENV\"\n",
    );
    env::remove_var("TELEGRAM_CHAT_ID");

    let cfg = cfg.unwrap();
    assert_eq!(cfg.telegram.bot_token, "");
    assert_eq!(cfg.telegram.chat_id, "");
    assert!(!cfg.telegram.is_configured());
}

#[test]
#[serial]
fn shipped_example_config_loads_without_credentials() {
    env::remove_var("TELEGRAM_BOT_TOKEN");
    env::remove_var("TELEGRAM_CHAT_ID");
    let cfg = CalendarConfig::load_from_file("config/calendar.example.toml").unwrap();
    assert!(!cfg.telegram.is_configured());
}

#[test]
#[serial]
fn shipped_example_config_parses() {
    env::set_var("TELEGRAM_BOT_TOKEN", "1:x");
    env::set_var("TELEGRAM_CHAT_ID", "2");
    let cfg = CalendarConfig::load_from_file("config/calendar.example.toml");
    env::remove_var("TELEGRAM_BOT_TOKEN");
    env::remove_var("TELEGRAM_CHAT_ID");

    let cfg = cfg.unwrap();
    assert_eq!(cfg.feeds.len(), 5);
    assert_eq!(cfg.feeds.iter().filter(|f| f.enabled).count(), 4);
    assert!(cfg.priorities().outranks(Source::Binance, Source::Airdrops));
}

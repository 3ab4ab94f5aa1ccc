use super::*;

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.kanso.name, "kanso");
    assert_eq!(config.kanso.data_dir, "~/.kanso");
    assert_eq!(config.kanso.log_level, "info");
    assert_eq!(config.store.db_path, "~/.kanso/data/kanso.db");
    assert_eq!(config.store.max_connections, 4);
    assert_eq!(config.reminder.due_soon_hours, 24);
    assert_eq!(config.export.horizon_days, 30);
}

#[test]
fn test_load_missing_file_falls_back_to_defaults() {
    let config = load("/nonexistent/kanso/config.toml").unwrap();
    assert_eq!(config.kanso.name, "kanso");
    assert_eq!(config.reminder.due_soon_hours, 24);
}

#[test]
fn test_parse_partial_toml_keeps_defaults() {
    let toml_str = r#"
        [kanso]
        name = "kanso-dev"

        [reminder]
        due_soon_hours = 48
    "#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.kanso.name, "kanso-dev");
    assert_eq!(config.kanso.log_level, "info");
    assert_eq!(config.reminder.due_soon_hours, 48);
    assert_eq!(config.export.horizon_days, 30);
}

#[test]
fn test_shellexpand_home() {
    std::env::set_var("HOME", "/home/tester");
    assert_eq!(shellexpand("~/x/y.db"), "/home/tester/x/y.db");
    assert_eq!(shellexpand("/abs/path.db"), "/abs/path.db");
}

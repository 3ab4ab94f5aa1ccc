pub(crate) fn default_name() -> String {
    "kanso".to_string()
}

pub(crate) fn default_data_dir() -> String {
    "~/.kanso".to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

pub(crate) fn default_db_path() -> String {
    "~/.kanso/data/kanso.db".to_string()
}

pub(crate) fn default_max_connections() -> u32 {
    4
}

pub(crate) fn default_due_soon_hours() -> i64 {
    24
}

pub(crate) fn default_horizon_days() -> i64 {
    30
}

//! Calibration file – reads/writes `~/.microrat/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use microrat_types::{Cell, Hand, RatConfig, RatError};

/// Return the path to `~/.microrat/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".microrat").join("config.toml")
}

/// Load the config from `path`. Returns `None` if the file does not exist.
///
/// Environment overrides are applied and the result is validated.
pub fn load_from(path: &Path) -> Result<Option<RatConfig>, RatError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RatError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let mut cfg: RatConfig = toml::from_str(&raw)
        .map_err(|e| RatError::Config(format!("failed to parse config: {e}")))?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Load `path`, writing the defaults there first if it is missing.
///
/// Returns the configuration and whether the file was created.
pub fn load_or_init(path: &Path) -> Result<(RatConfig, bool), RatError> {
    if let Some(cfg) = load_from(path)? {
        return Ok((cfg, false));
    }
    let defaults = RatConfig::default();
    save_to(&defaults, path)?;
    let mut cfg = defaults;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok((cfg, true))
}

/// Apply `MICRORAT_*` environment variable overrides to `cfg`.
///
/// Unparseable values are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `MICRORAT_TARGET_X` | `maze.target.x` |
/// | `MICRORAT_TARGET_Y` | `maze.target.y` |
/// | `MICRORAT_HAND` | `navigation.hand` |
/// | `MICRORAT_TICK_PERIOD_MS` | `controller.tick_period_ms` |
pub fn apply_env_overrides(cfg: &mut RatConfig) {
    if let Ok(v) = std::env::var("MICRORAT_TARGET_X")
        && let Ok(x) = v.trim().parse::<i32>()
    {
        cfg.maze.target = Cell::new(x, cfg.maze.target.y);
    }
    if let Ok(v) = std::env::var("MICRORAT_TARGET_Y")
        && let Ok(y) = v.trim().parse::<i32>()
    {
        cfg.maze.target = Cell::new(cfg.maze.target.x, y);
    }
    if let Ok(v) = std::env::var("MICRORAT_HAND")
        && let Ok(hand) = v.parse::<Hand>()
    {
        cfg.navigation.hand = hand;
    }
    if let Ok(v) = std::env::var("MICRORAT_TICK_PERIOD_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.controller.tick_period_ms = ms;
    }
}

/// Save the config to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &RatConfig, path: &Path) -> Result<(), RatError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RatError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RatError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        RatError::Config(format!("failed to write config at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Loading reads `MICRORAT_*`; tests that load or set them run one at a time.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn roundtrip_default_config() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&RatConfig::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.maze.target, Cell::new(6, 3));
        assert_eq!(loaded.controller.pwm_max, 3300);
        assert_eq!(loaded.navigation.hand, Hand::Left);
    }

    #[test]
    fn config_path_points_to_microrat_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".microrat"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn load_or_init_writes_defaults_once() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join("config.toml");

        let (_, created) = load_or_init(&path).expect("first load");
        assert!(created);
        assert!(path.exists());
        let (_, created) = load_or_init(&path).expect("second load");
        assert!(!created);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[navigation]\nhand = \"right\"\n\n[controller]\nkp_turn = 75.0\n")
            .expect("write");

        let cfg = load_from(&path).expect("load").expect("some");
        assert_eq!(cfg.navigation.hand, Hand::Right);
        assert!((cfg.controller.kp_turn - 75.0).abs() < f32::EPSILON);
        assert_eq!(cfg.maze.width, 7);
        assert_eq!(cfg.movement, RatConfig::default().movement);
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");

        fs::write(&path, "[maze\nwidth = 3").expect("write");
        assert!(matches!(load_from(&path), Err(RatError::Config(_))));

        fs::write(&path, "[maze]\nwidth = 0\n").expect("write");
        assert!(matches!(load_from(&path), Err(RatError::Config(_))));
    }

    #[test]
    fn apply_env_overrides_changes_fields() {
        let _env = env_lock();
        // SAFETY: serialised by ENV_LOCK.
        unsafe {
            std::env::set_var("MICRORAT_TARGET_X", "3");
            std::env::set_var("MICRORAT_TARGET_Y", "2");
            std::env::set_var("MICRORAT_HAND", "Right");
            std::env::set_var("MICRORAT_TICK_PERIOD_MS", "not-a-number");
        }
        let mut cfg = RatConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.maze.target, Cell::new(3, 2));
        assert_eq!(cfg.navigation.hand, Hand::Right);
        assert_eq!(cfg.controller.tick_period_ms, 1);

        unsafe { std::env::set_var("MICRORAT_TICK_PERIOD_MS", "2") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.controller.tick_period_ms, 2);

        unsafe {
            std::env::remove_var("MICRORAT_TARGET_X");
            std::env::remove_var("MICRORAT_TARGET_Y");
            std::env::remove_var("MICRORAT_HAND");
            std::env::remove_var("MICRORAT_TICK_PERIOD_MS");
        }
    }
}

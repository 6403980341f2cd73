//! Audio profiles via an external helper program
//!
//! The helper (SoundVolumeView by default) saves and restores the complete
//! audio device configuration to a profile file. One file per
//! [`AudioProfile`].

use crate::actions::command::{CommandRunner, CommandTemplate};
use crate::actions::{AudioProfile, AudioProfileService};
use common::ActionError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct HelperAudioProfiles {
    helper: PathBuf,
    docked_profile: PathBuf,
    undocked_profile: PathBuf,
    load_args: CommandTemplate,
    save_args: CommandTemplate,
    runner: CommandRunner,
}

impl HelperAudioProfiles {
    pub fn new(
        helper: PathBuf,
        docked_profile: PathBuf,
        undocked_profile: PathBuf,
        load_args: CommandTemplate,
        save_args: CommandTemplate,
        runner: CommandRunner,
    ) -> Self {
        Self {
            helper,
            docked_profile,
            undocked_profile,
            load_args,
            save_args,
            runner,
        }
    }

    /// Warn early when the helper is configured as a path that does not exist
    ///
    /// Bare program names are looked up on PATH at call time and not checked.
    pub fn check_helper(&self) -> bool {
        if self.helper.components().count() > 1 && !self.helper.exists() {
            warn!("Audio helper not found at: {}", self.helper.display());
            return false;
        }
        true
    }

    pub fn profile_path(&self, profile: AudioProfile) -> &Path {
        match profile {
            AudioProfile::Docked => &self.docked_profile,
            AudioProfile::Undocked => &self.undocked_profile,
        }
    }
}

impl AudioProfileService for HelperAudioProfiles {
    fn load_profile(&self, profile: AudioProfile) -> Result<(), ActionError> {
        let path = self.profile_path(profile);
        if !path.exists() {
            return Err(ActionError::NotFound(format!(
                "{} audio profile {}",
                profile,
                path.display()
            )));
        }

        let args = self.load_args.render("profile", &path.display().to_string());
        self.runner.run(&self.helper, &args)?;

        info!("Audio profile '{}' loaded from {}", profile, path.display());
        Ok(())
    }

    fn save_profile(&self, profile: AudioProfile) -> Result<(), ActionError> {
        let path = self.profile_path(profile);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let args = self.save_args.render("profile", &path.display().to_string());
        self.runner.run(&self.helper, &args)?;

        info!("Audio profile '{}' saved to {}", profile, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn template(parts: &[&str]) -> CommandTemplate {
        CommandTemplate::new(parts.iter().map(|s| s.to_string()).collect())
    }

    fn profiles(dir: &Path, helper: &str, load: &[&str]) -> HelperAudioProfiles {
        HelperAudioProfiles::new(
            PathBuf::from(helper),
            dir.join("docked_profile.spr"),
            dir.join("undocked_profile.spr"),
            template(load),
            template(&["/SaveProfile", "{profile}"]),
            CommandRunner::default(),
        )
    }

    #[test]
    fn test_missing_profile_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let audio = profiles(dir.path(), "SoundVolumeView.exe", &["/LoadProfile", "{profile}"]);

        let result = audio.load_profile(AudioProfile::Docked);
        assert!(matches!(result, Err(ActionError::NotFound(_))));
    }

    #[test]
    fn test_check_helper_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("SoundVolumeView.exe");
        let audio = profiles(dir.path(), missing.to_str().unwrap(), &[]);
        assert!(!audio.check_helper());

        // Bare names resolve through PATH later
        let audio = profiles(dir.path(), "SoundVolumeView.exe", &[]);
        assert!(audio.check_helper());
    }

    #[cfg(unix)]
    #[test]
    fn test_load_passes_profile_path_to_helper() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("undocked_profile.spr"), b"profile").unwrap();

        // `test -f <path>` succeeds only if the rendered argument is the profile file
        let audio = profiles(dir.path(), "test", &["-f", "{profile}"]);
        assert!(audio.load_profile(AudioProfile::Undocked).is_ok());
    }
}

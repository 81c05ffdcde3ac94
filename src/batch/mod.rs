//! Batch driver: discover clip files, check each one, aggregate the results.
//!
//! Directories are processed one at a time and files in sorted order. The
//! only state carried across files is the running worst error. Malformed
//! filenames either abort the run or are skipped, depending on
//! [`MalformedPolicy`].

pub mod report;

use std::fs;
use std::path::{Path, PathBuf};

pub use report::{
    format_worst_error, DirectoryOutcome, DirectoryReport, FileReport, RunSummary, SkippedFile,
};

use report::file_name;

use crate::analysis::{ClipSpec, OnsetPipeline};
use crate::audio::load_mono;
use crate::config::{AppConfig, MalformedPolicy};
use crate::error::CheckError;

/// Non-recursive listing of the `.wav` files in one directory
#[derive(Debug, Clone)]
pub struct ClipCatalog {
    dir: PathBuf,
}

impl ClipCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// `.wav` files sorted by file name; hidden files are ignored
    ///
    /// # Errors
    /// `CheckError::DirectoryRead` when the directory cannot be listed.
    pub fn discover(&self) -> Result<Vec<PathBuf>, CheckError> {
        let read_error = |err: std::io::Error| CheckError::DirectoryRead {
            path: self.dir.clone(),
            reason: err.to_string(),
        };

        let mut clips = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            // Follows symlinks, so linked clips are listed like regular files
            if !path.is_file() {
                continue;
            }
            let hidden = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'));
            if !hidden && path.extension().and_then(|ext| ext.to_str()) == Some("wav") {
                clips.push(path);
            }
        }

        clips.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(clips)
    }
}

/// Progress notifications emitted while a directory is checked
#[derive(Debug, Clone, Copy)]
pub enum BatchEvent<'a> {
    /// Directory exists but holds no clips
    Empty(&'a Path),
    /// Checking of a non-empty directory is starting
    Started(&'a Path),
    File(&'a FileReport),
    Skipped(&'a SkippedFile),
    /// All files of the directory are done
    Finished(&'a DirectoryReport),
}

/// Checks clip files and directories against one configuration
pub struct BatchChecker {
    pipeline: OnsetPipeline,
    policy: MalformedPolicy,
}

impl BatchChecker {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            pipeline: OnsetPipeline::new(config),
            policy: config.batch.malformed_policy,
        }
    }

    /// Parse, load and measure one clip
    ///
    /// # Errors
    /// `MalformedInput` for a name without a clip spec, `AudioLoad` or
    /// `EmptyAudio` for undecodable files, `AnalysisFailed` from the envelope.
    pub fn check_file(&self, path: &Path) -> Result<FileReport, CheckError> {
        let spec = ClipSpec::parse(path)?;
        let clip = load_mono(path, self.pipeline.sample_rate())?;
        let measurement = self.pipeline.check(&clip.samples, spec)?;
        Ok(FileReport::new(path, measurement))
    }

    /// Check every clip in `dir` without progress output
    pub fn check_directory(&self, dir: &Path) -> Result<DirectoryOutcome, CheckError> {
        self.check_directory_with(dir, |_| {})
    }

    /// Check every clip in `dir`, reporting progress to `observer`
    ///
    /// A missing directory yields `DirectoryOutcome::Missing` without any
    /// event. Malformed names follow the configured policy; every other
    /// error aborts.
    pub fn check_directory_with<F>(
        &self,
        dir: &Path,
        mut observer: F,
    ) -> Result<DirectoryOutcome, CheckError>
    where
        F: FnMut(BatchEvent<'_>),
    {
        let catalog = ClipCatalog::new(dir);
        if !catalog.exists() {
            tracing::debug!("[Batch] Skipping missing directory {}", dir.display());
            return Ok(DirectoryOutcome::Missing {
                dir: dir.to_path_buf(),
            });
        }

        let clips = catalog.discover()?;
        if clips.is_empty() {
            observer(BatchEvent::Empty(dir));
            return Ok(DirectoryOutcome::Empty {
                dir: dir.to_path_buf(),
            });
        }

        observer(BatchEvent::Started(dir));
        tracing::info!("[Batch] Checking {} clips in {}", clips.len(), dir.display());

        let mut report = DirectoryReport::new(dir);
        for path in &clips {
            match self.check_file(path) {
                Ok(file) => {
                    observer(BatchEvent::File(&file));
                    report.push(file);
                }
                Err(err) if err.is_malformed_input() && self.policy == MalformedPolicy::Skip => {
                    tracing::warn!("[Batch] Skipping {}: {}", path.display(), err);
                    let skipped = SkippedFile {
                        name: file_name(path),
                        path: path.clone(),
                        reason: err.to_string(),
                    };
                    observer(BatchEvent::Skipped(&skipped));
                    report.skipped.push(skipped);
                }
                Err(err) => return Err(err),
            }
        }

        observer(BatchEvent::Finished(&report));
        Ok(DirectoryOutcome::Checked(report))
    }

    /// Check a list of directories in order and aggregate the results
    pub fn check_directories_with<F>(
        &self,
        dirs: &[PathBuf],
        mut observer: F,
    ) -> Result<RunSummary, CheckError>
    where
        F: FnMut(BatchEvent<'_>),
    {
        let mut summary = RunSummary::default();
        for dir in dirs {
            summary.push(self.check_directory_with(dir, &mut observer)?);
        }
        Ok(summary)
    }

    /// Check `<root>/<set>` for every configured set name
    pub fn check_sets<F>(
        &self,
        root: &Path,
        sets: &[String],
        observer: F,
    ) -> Result<RunSummary, CheckError>
    where
        F: FnMut(BatchEvent<'_>),
    {
        let dirs: Vec<PathBuf> = sets.iter().map(|set| root.join(set)).collect();
        self.check_directories_with(&dirs, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{write_wav, ClickTrack};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cycle_check_batch_{}_{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_clip(dir: &Path, name: &str, beat: u32, decay: u32) {
        let spec = ClipSpec {
            beat_frames: beat,
            decay_frames: decay,
        };
        let samples = ClickTrack::for_clip(spec, 30.0, 35.0, 44_100).render();
        write_wav(&dir.join(name), &samples, 44_100).unwrap();
    }

    #[test]
    fn test_discover_sorts_and_filters() {
        let dir = scratch_dir("discover");
        for name in ["b_1_1.wav", "a_1_1.wav", "notes.txt", ".hidden_1_1.wav"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        fs::create_dir_all(dir.join("nested.wav")).unwrap();

        let clips = ClipCatalog::new(&dir).discover().unwrap();
        let names: Vec<String> = clips.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a_1_1.wav", "b_1_1.wav"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_follows_symlinked_clips() {
        let store = scratch_dir("symlink_store");
        let dir = scratch_dir("symlink_dir");
        write_clip(&store, "real_12_18.wav", 12, 18);
        std::os::unix::fs::symlink(store.join("real_12_18.wav"), dir.join("clip_12_18.wav"))
            .unwrap();

        let clips = ClipCatalog::new(&dir).discover().unwrap();
        assert_eq!(clips, vec![dir.join("clip_12_18.wav")]);

        let outcome = BatchChecker::new(&AppConfig::default())
            .check_directory(&dir)
            .unwrap();
        let report = outcome.report().expect("symlinked clip is checked");
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].name, "clip_12_18.wav");
        let _ = fs::remove_dir_all(&dir);
        let _ = fs::remove_dir_all(&store);
    }

    #[test]
    fn test_missing_and_empty_directories() {
        let checker = BatchChecker::new(&AppConfig::default());
        let dir = scratch_dir("empty");

        let mut events = Vec::new();
        let outcome = checker
            .check_directory_with(&dir, |event| events.push(format!("{event:?}")))
            .unwrap();
        assert!(matches!(outcome, DirectoryOutcome::Empty { .. }));
        assert_eq!(events.len(), 1);

        let missing = dir.join("absent");
        let outcome = checker.check_directory(&missing).unwrap();
        assert!(matches!(outcome, DirectoryOutcome::Missing { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_name_aborts_by_default() {
        let dir = scratch_dir("abort");
        write_clip(&dir, "a_6_9.wav", 6, 9);
        write_clip(&dir, "b_take2.wav", 6, 9);

        let checker = BatchChecker::new(&AppConfig::default());
        let err = checker.check_directory(&dir).unwrap_err();
        assert!(err.is_malformed_input());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_name_skipped_with_policy() {
        let dir = scratch_dir("skip");
        write_clip(&dir, "a_6_9.wav", 6, 9);
        write_clip(&dir, "b_take2.wav", 6, 9);

        let mut config = AppConfig::default();
        config.batch.malformed_policy = MalformedPolicy::Skip;
        let checker = BatchChecker::new(&config);

        let outcome = checker.check_directory(&dir).unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "b_take2.wav");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_check_sets_skips_missing_set() {
        let root = scratch_dir("sets");
        let piano = root.join("piano");
        fs::create_dir_all(&piano).unwrap();
        write_clip(&piano, "piano_12_18.wav", 12, 18);

        let checker = BatchChecker::new(&AppConfig::default());
        let sets = vec!["piano".to_string(), "woodblock".to_string()];
        let mut lines = Vec::new();
        let summary = checker
            .check_sets(&root, &sets, |event| {
                if let BatchEvent::File(file) = event {
                    lines.push(file.format_line());
                }
            })
            .unwrap();

        assert_eq!(summary.files_checked, 1);
        assert_eq!(lines.len(), 1);
        assert!(summary.all_passed(), "{}", lines[0]);
        assert!(matches!(
            summary.directories[1],
            DirectoryOutcome::Missing { .. }
        ));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_undecodable_file_aborts() {
        let dir = scratch_dir("corrupt");
        fs::write(dir.join("broken_1_1.wav"), b"not a wav").unwrap();

        let mut config = AppConfig::default();
        config.batch.malformed_policy = MalformedPolicy::Skip;
        let err = BatchChecker::new(&config).check_directory(&dir).unwrap_err();
        assert!(matches!(err, CheckError::AudioLoad { .. }));
        let _ = fs::remove_dir_all(&dir);
    }
}

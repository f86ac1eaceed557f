//! Persistence of window events and frame captures.
//!
//! A recording session writes one text file per finalized window into a
//! timestamped run directory:
//!
//! ```text
//! {output_root}/run_20240122_100000/frame_000001_t0_1000us.txt
//! ```
//!
//! Each line holds one retained event as `"{x} {y}"`. Files are written to a
//! temporary sibling and renamed into place.

use crate::core::frame::Frame;
use crate::core::windowing::Window;
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Errors that can occur while writing recordings or captures.
#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Name of the file holding the `counter`-th recorded window.
pub fn frame_file_name(counter: u64, window_start: i64) -> String {
    format!("frame_{counter:06}_t0_{window_start}us.txt")
}

/// Name of the run directory for a recording started at `now`.
pub fn run_dir_name(now: DateTime<Local>) -> String {
    format!("run_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Name of a capture taken at `now`.
pub fn capture_file_name(now: DateTime<Local>) -> String {
    format!("capture_{}.pgm", now.format("%Y%m%d_%H%M%S_%3f"))
}

/// Create a fresh run directory under `root`.
///
/// If a run with the same second already exists, a numeric suffix is
/// appended so two sessions never share a directory.
pub fn create_run_dir(root: &Path, now: DateTime<Local>) -> Result<PathBuf, PersistenceError> {
    fs::create_dir_all(root).map_err(|source| PersistenceError::CreateDir {
        path: root.to_path_buf(),
        source,
    })?;

    let base = run_dir_name(now);
    let mut candidate = root.join(&base);
    let mut suffix = 1;
    loop {
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate = root.join(format!("{base}_{suffix}"));
                suffix += 1;
            }
            Err(source) => {
                return Err(PersistenceError::CreateDir {
                    path: candidate,
                    source,
                })
            }
        }
    }
}

/// Write `path` via a temporary sibling so readers never see a partial file.
fn write_atomically(
    path: &Path,
    fill: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), PersistenceError> {
    let tmp = path.with_extension("tmp");
    let result = File::create(&tmp)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            fill(&mut writer)?;
            writer.flush()
        })
        .and_then(|()| fs::rename(&tmp, path));

    result.map_err(|source| {
        let _ = fs::remove_file(&tmp);
        PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Writes recorded windows and numbers them within a recording session.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    written: u64,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files written since the last counter reset.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Restart numbering at 1 for the next file.
    pub fn reset_counter(&mut self) {
        self.written = 0;
    }

    /// Write the retained events of `window` into `dir`.
    ///
    /// The counter only advances when the file was written.
    pub fn write_window(&mut self, dir: &Path, window: &Window) -> Result<PathBuf, PersistenceError> {
        let path = dir.join(frame_file_name(self.written + 1, window.start));
        write_atomically(&path, |out| {
            for event in &window.events {
                writeln!(out, "{} {}", event.x, event.y)?;
            }
            Ok(())
        })?;
        self.written += 1;
        Ok(path)
    }
}

/// Save `frame` as a binary PGM under `{root}/captures`.
pub fn save_capture(root: &Path, frame: &Frame, now: DateTime<Local>) -> Result<PathBuf, PersistenceError> {
    let dir = root.join("captures");
    fs::create_dir_all(&dir).map_err(|source| PersistenceError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    let path = dir.join(capture_file_name(now));
    write_atomically(&path, |out| {
        write!(out, "P5\n{} {}\n255\n", frame.width(), frame.height())?;
        out.write_all(frame.pixels())
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::{Event, Geometry, Polarity};
    use crate::core::windowing::WindowManager;
    use chrono::TimeZone;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("evs-recording-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn recorded_window(events: &[(u16, u16)], start: i64) -> Window {
        let mut manager = WindowManager::new(2000, Geometry::new(16, 16));
        let mut sink = |_: &Window| {};
        for &(x, y) in events {
            manager.process_event(Event::new(x, y, Polarity::On, start), true, &mut sink);
        }
        manager.current().cloned().unwrap()
    }

    #[test]
    fn test_names() {
        let now = Local.with_ymd_and_hms(2024, 1, 22, 10, 0, 5).unwrap();
        assert_eq!(frame_file_name(1, 1000), "frame_000001_t0_1000us.txt");
        assert_eq!(frame_file_name(1234567, 0), "frame_1234567_t0_0us.txt");
        assert_eq!(run_dir_name(now), "run_20240122_100005");
        assert_eq!(capture_file_name(now), "capture_20240122_100005_000.pgm");
    }

    #[test]
    fn test_write_window_contents() {
        let dir = scratch("window");
        fs::create_dir_all(&dir).unwrap();
        let mut recorder = FrameRecorder::new();

        let window = recorded_window(&[(0, 0), (5, 5), (0, 0)], 1000);
        let path = recorder.write_window(&dir, &window).unwrap();
        assert_eq!(path.file_name().unwrap(), "frame_000001_t0_1000us.txt");
        assert_eq!(fs::read_to_string(&path).unwrap(), "0 0\n5 5\n0 0\n");
        assert_eq!(recorder.written(), 1);

        let second = recorder.write_window(&dir, &window).unwrap();
        assert!(second.ends_with("frame_000002_t0_1000us.txt"));

        recorder.reset_counter();
        assert_eq!(recorder.written(), 0);
        // No temporary files are left behind.
        let leftovers = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .count();
        assert_eq!(leftovers, 0);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_write_into_missing_dir_fails_without_advancing() {
        let dir = scratch("missing");
        let mut recorder = FrameRecorder::new();
        let window = recorded_window(&[(1, 1)], 0);
        assert!(matches!(
            recorder.write_window(&dir, &window),
            Err(PersistenceError::Write { .. })
        ));
        assert_eq!(recorder.written(), 0);
    }

    #[test]
    fn test_run_dirs_never_collide() {
        let root = scratch("runs");
        let now = Local.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        let first = create_run_dir(&root, now).unwrap();
        let second = create_run_dir(&root, now).unwrap();
        assert_ne!(first, second);
        assert!(first.ends_with("run_20240122_100000"));
        assert!(second.ends_with("run_20240122_100000_1"));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn test_run_dir_under_file_fails() {
        let root = scratch("blocked");
        fs::create_dir_all(root.parent().unwrap()).unwrap();
        fs::write(&root, b"not a directory").unwrap();
        let now = Local.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        assert!(matches!(
            create_run_dir(&root, now),
            Err(PersistenceError::CreateDir { .. })
        ));
        let _ = fs::remove_file(root);
    }

    #[test]
    fn test_capture_is_pgm() {
        let root = scratch("capture");
        let mut frame = Frame::new(Geometry::new(3, 2));
        frame.mark(2, 1);
        let now = Local.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        let path = save_capture(&root, &frame, now).unwrap();
        let bytes = fs::read(path).unwrap();
        assert!(bytes.starts_with(b"P5\n3 2\n255\n"));
        assert_eq!(&bytes[bytes.len() - 6..], &[0, 0, 0, 0, 0, 255]);
        let _ = fs::remove_dir_all(root);
    }
}

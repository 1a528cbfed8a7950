//! End-to-end file handling without audio hardware: raw WAV files written
//! through the sink are named, relocated and pruned like a finished session.

use std::collections::HashSet;
use std::path::Path;

use audioknight::audio::{SampleBuffer, SampleKind, StreamFormat, WavSink};
use audioknight::session::{claim_file_name, recording_folder_name};
use audioknight::storage::{paths_equal, relocate};

fn record(dir: &Path, channel: &str, claimed: &mut HashSet<String>) -> std::path::PathBuf {
    let format = StreamFormat {
        sample_rate: 44_100,
        channels: 1,
        sample_kind: SampleKind::I16,
    };
    let path = dir.join(claim_file_name(dir, channel, "wav", claimed));
    let sink = WavSink::create(&path, &format).unwrap();
    sink.append(SampleBuffer::I16(&[0, 100, -100, 0])).unwrap();
    sink.finalize().unwrap();
    path
}

#[test]
fn test_session_folder_is_moved_and_pruned() {
    let root = tempfile::tempdir().unwrap();
    let working = root
        .path()
        .join("Temp")
        .join(recording_folder_name(chrono::Local::now()));
    let final_dir = root.path().join("Final");
    std::fs::create_dir_all(&working).unwrap();
    std::fs::create_dir_all(&final_dir).unwrap();

    let mut claimed = HashSet::new();
    let files = vec![
        record(&working, "Mic: Left", &mut claimed),
        record(&working, "Mic/ Left", &mut claimed),
    ];
    assert_eq!(
        files.iter().map(|f| f.file_name().unwrap().to_str().unwrap()).collect::<Vec<_>>(),
        vec!["Mic_ Left.wav", "Mic_ Left_2.wav"]
    );

    for file in &files {
        let moved = relocate(file, &final_dir).unwrap();
        let reader = hound::WavReader::open(&moved).unwrap();
        assert_eq!(reader.len(), 4);
    }

    assert!(!working.exists(), "empty working folder should be pruned");
    assert!(root.path().join("Temp").exists(), "only the run folder is pruned");
}

#[test]
fn test_same_folder_is_left_alone() {
    let root = tempfile::tempdir().unwrap();
    let mut claimed = HashSet::new();
    let file = record(root.path(), "Desktop", &mut claimed);

    let with_slash = format!("{}/", root.path().display());
    assert!(paths_equal(root.path(), Path::new(&with_slash)));

    let result = relocate(&file, Path::new(&with_slash)).unwrap();
    assert_eq!(result, file);
    assert!(file.exists());
}

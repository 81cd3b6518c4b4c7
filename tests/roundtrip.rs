use std::{
    fs,
    io,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use huffarc::{
    compress, decompress, read_archive, read_stream,
    compression::entry::ArchiveEntry,
    tools::{
        progress::NoProgress,
        prompt::{Interaction, Unattended},
    },
    ArchiveError, CompressOptions, Estimate, Layout, Outcome, Strategy,
};

/// Continues unattended and remembers the estimate it was shown.
#[derive(Default)]
struct Recording {
    seen: Option<Estimate>,
}

impl Interaction for Recording {
    fn password(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn confirm(&mut self, estimate: &Estimate) -> io::Result<bool> {
        self.seen = Some(*estimate);
        Ok(true)
    }
}

fn run(inputs: &[PathBuf], output: &Path, layout: Layout, strategy: Strategy) -> Outcome {
    let opts = CompressOptions {
        layout,
        strategy,
        force: false,
    };
    compress(
        inputs,
        output,
        &opts,
        &mut Unattended::default(),
        &NoProgress,
    )
    .unwrap()
}

/// What an archive entry for `path` must decode to, named `name`; children sorted by name bytes.
fn load_tree(path: &Path, name: &[u8]) -> ArchiveEntry {
    if path.is_dir() {
        let mut children: Vec<ArchiveEntry> = fs::read_dir(path)
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                load_tree(&e.path(), e.file_name().as_bytes())
            })
            .collect();
        children.sort_by(|a, b| a.name().cmp(b.name()));
        ArchiveEntry::Directory {
            name: name.to_vec(),
            children,
        }
    } else {
        ArchiveEntry::File {
            name: name.to_vec(),
            content: fs::read(path).unwrap(),
        }
    }
}

fn named(path: &Path) -> Vec<u8> {
    path.as_os_str().as_bytes().to_vec()
}

/// A small tree with nested directories, an empty file and an empty directory.
fn sample_tree(base: &Path) -> PathBuf {
    let root = base.join("project");
    fs::create_dir_all(root.join("src/nested")).unwrap();
    fs::create_dir_all(root.join("empty_dir")).unwrap();
    fs::write(root.join("README"), b"A readme with some repeated text text text.").unwrap();
    fs::write(root.join("src/main.txt"), b"fn main() { println!(\"hi\"); }").unwrap();
    fs::write(root.join("src/nested/blob.bin"), (0..=255_u8).collect::<Vec<_>>()).unwrap();
    fs::write(root.join("src/nested/empty"), b"").unwrap();
    root
}

#[test]
fn raw_stream_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cases: Vec<Vec<u8>> = vec![
        vec![],
        b"aaab".to_vec(),
        vec![b'z'; 1000],
        (0..=255_u8).cycle().take(10_000).collect(),
        b"It was the best of times, it was the worst of times".to_vec(),
    ];
    for (i, data) in cases.iter().enumerate() {
        let input = dir.path().join(format!("case{}", i));
        fs::write(&input, data).unwrap();
        let output = dir.path().join(format!("case{}.compressed", i));
        assert!(matches!(
            run(&[input], &output, Layout::Stream, Strategy::default()),
            Outcome::Written(_)
        ));
        let (header, decoded) = read_stream(fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(header.total_size, data.len() as u64);
        assert_eq!(&decoded, data);
    }
}

#[test]
fn aaab_file_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("aaab");
    fs::write(&input, b"aaab").unwrap();
    let output = dir.path().join("aaab.compressed");
    run(&[input], &output, Layout::Stream, Strategy::Sequential);
    assert_eq!(
        fs::read(&output).unwrap(),
        vec![4, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0x62, 0x01, 0xb0, 0x80, 0x84]
    );
}

#[test]
fn directory_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let root = sample_tree(dir.path());
    let single = dir.path().join("single.txt");
    fs::write(&single, b"standalone").unwrap();
    let output = dir.path().join("all.compressed");

    let outcome = run(
        &[root.clone(), single.clone()],
        &output,
        Layout::Archive,
        Strategy::default(),
    );
    match outcome {
        Outcome::Written(summary) => {
            assert_eq!(summary.files, 5);
            assert_eq!(summary.original_size, 43 + 29 + 256 + 10);
        }
        Outcome::Aborted => panic!("unattended run aborted"),
    }

    let archive = read_archive(fs::File::open(&output).unwrap()).unwrap();
    assert_eq!(archive.entries.len(), 2);
    assert_eq!(archive.entries[0], load_tree(&root, &named(&root)));
    assert_eq!(archive.entries[1], load_tree(&single, &named(&single)));

    let restore = dir.path().join("restore");
    decompress(&output, Some(&restore), Layout::Archive, false).unwrap();
    assert_eq!(
        fs::read(restore.join("project/src/nested/blob.bin")).unwrap(),
        (0..=255_u8).collect::<Vec<_>>()
    );
    assert!(fs::read(restore.join("project/src/nested/empty"))
        .unwrap()
        .is_empty());
    assert!(restore.join("project/empty_dir").is_dir());
    assert_eq!(fs::read(restore.join("single.txt")).unwrap(), b"standalone");

    // A second unpack into the same place needs --force
    assert!(matches!(
        decompress(&output, Some(&restore), Layout::Archive, false),
        Err(ArchiveError::OutputExists(_))
    ));
    decompress(&output, Some(&restore), Layout::Archive, true).unwrap();
}

#[test]
fn archive_written_into_its_own_input() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("d");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("all"), (0..=255_u8).collect::<Vec<_>>()).unwrap();
    let output = root.join("out.compressed");

    for force in [false, true] {
        let mut recording = Recording::default();
        let opts = CompressOptions {
            force,
            ..Default::default()
        };
        let outcome = compress(
            &[root.clone()],
            &output,
            &opts,
            &mut recording,
            &NoProgress,
        )
        .unwrap();
        let written = fs::metadata(&output).unwrap().len();
        assert_eq!(recording.seen.unwrap().compressed_size, written);
        match outcome {
            Outcome::Written(summary) => assert_eq!(summary.files, 1),
            Outcome::Aborted => panic!("recording interaction never aborts"),
        }

        let archive = read_archive(fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(
            archive.entries,
            vec![ArchiveEntry::Directory {
                name: named(&root),
                children: vec![ArchiveEntry::File {
                    name: b"all".to_vec(),
                    content: (0..=255_u8).collect(),
                }],
            }]
        );
    }
}

#[test]
fn root_given_through_parent_component() {
    let dir = tempfile::tempdir().unwrap();
    let root = sample_tree(dir.path());
    fs::create_dir(root.join("sub")).unwrap();
    let output = dir.path().join("dots.compressed");

    run(
        &[root.join("sub/..")],
        &output,
        Layout::Archive,
        Strategy::default(),
    );
    let archive = read_archive(fs::File::open(&output).unwrap()).unwrap();
    assert_eq!(archive.entries[0].name(), b"project");

    let restore = dir.path().join("restore");
    decompress(&output, Some(&restore), Layout::Archive, false).unwrap();
    assert_eq!(
        load_tree(&restore.join("project"), b"project"),
        load_tree(&root, b"project")
    );
}

#[test]
fn worker_count_does_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    let root = sample_tree(dir.path());
    let other = dir.path().join("other.txt");
    fs::write(&other, b"another root input").unwrap();
    let inputs = vec![root, other];

    let strategies = [
        Strategy::Sequential,
        Strategy::Parallel { workers: 1 },
        Strategy::Parallel { workers: 4 },
    ];
    let outputs: Vec<Vec<u8>> = strategies
        .iter()
        .enumerate()
        .map(|(i, &strategy)| {
            let output = dir.path().join(format!("out{}.compressed", i));
            run(&inputs, &output, Layout::Archive, strategy);
            fs::read(&output).unwrap()
        })
        .collect();
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
}

#[test]
fn estimate_matches_written_size() {
    let dir = tempfile::tempdir().unwrap();
    let root = sample_tree(dir.path());
    let output = dir.path().join("est.compressed");

    let mut recording = Recording::default();
    let outcome = compress(
        &[root],
        &output,
        &CompressOptions::default(),
        &mut recording,
        &NoProgress,
    )
    .unwrap();
    let estimate = recording.seen.unwrap();
    let written = fs::metadata(&output).unwrap().len();
    assert_eq!(estimate.compressed_size, written);
    match outcome {
        Outcome::Written(summary) => assert_eq!(summary.compressed_size, written),
        Outcome::Aborted => panic!("recording interaction never aborts"),
    }
}

#[test]
fn password_is_stored_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("secret.txt");
    fs::write(&input, b"not actually encrypted").unwrap();
    let output = dir.path().join("secret.compressed");

    let mut interaction = Unattended {
        password: Some(b"open sesame".to_vec()),
    };
    compress(
        &[input],
        &output,
        &CompressOptions::default(),
        &mut interaction,
        &NoProgress,
    )
    .unwrap();

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[9..13], &[1, 11, b'o', b'p']);
    let archive = read_archive(bytes.as_slice()).unwrap();
    assert_eq!(archive.header.password, Some(b"open sesame".to_vec()));
}

#[test]
fn empty_password_deletes_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    fs::write(&input, b"data").unwrap();
    let output = dir.path().join("in.compressed");

    let mut interaction = Unattended {
        password: Some(Vec::new()),
    };
    let result = compress(
        &[input],
        &output,
        &CompressOptions::default(),
        &mut interaction,
        &NoProgress,
    );
    assert!(matches!(result, Err(ArchiveError::PasswordInvalid(0))));
    assert!(!output.exists());
}

#[test]
fn missing_input_has_its_own_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("none.compressed");
    let err = compress(
        &[dir.path().join("nope")],
        &output,
        &CompressOptions::default(),
        &mut Unattended::default(),
        &NoProgress,
    )
    .unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(!output.exists());
}

#[test]
fn raw_decompress_strips_extension() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plain.txt");
    fs::write(&input, b"round and round").unwrap();
    let output = dir.path().join("plain.txt.compressed");
    run(&[input.clone()], &output, Layout::Stream, Strategy::default());

    fs::remove_file(&input).unwrap();
    let restored = decompress(&output, None, Layout::Stream, false).unwrap();
    assert_eq!(restored, input);
    assert_eq!(fs::read(&input).unwrap(), b"round and round");
}

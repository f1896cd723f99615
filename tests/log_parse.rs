use bender::progress::{parse_line, saved_path, ProgressUpdate};

#[test]
fn short_line_uses_running_frame() {
    let mut frame = 5;
    let update = parse_line("Time:00:14.42 | Remaining:03:01.65 | Sample 17/256", &mut frame);
    assert_eq!(
        update,
        Some(ProgressUpdate {
            frame: 5,
            sample: "17/256".into(),
            time: "00:14".into(),
            remaining: None,
        })
    );
    assert_eq!(frame, 5);
}

#[test]
fn finished_advances_frame_without_update() {
    let mut frame = 5;
    assert_eq!(parse_line("01:52.310  render | Mem: 2007M | Finished", &mut frame), None);
    assert_eq!(frame, 6);

    let update = parse_line("00:01.100  render | Mem: 1614M | Sample 1/512", &mut frame).unwrap();
    assert_eq!(update.frame, 6);
}

#[test]
fn long_line_carries_remaining() {
    let mut frame = 1;
    let update = parse_line(
        "00:34.042  render           | Remaining: 07:03.80 | Mem: 2007M | Sample 33/512 (Using optimized kernels)",
        &mut frame,
    )
    .unwrap();
    assert_eq!(update.sample, "33/512");
    assert_eq!(update.time, "00:34");
    assert_eq!(update.remaining.as_deref(), Some("07:03"));
    assert_eq!(update.frame, 1);
}

#[test]
fn first_sample_line_has_no_remaining() {
    let mut frame = 3;
    let update = parse_line(
        "00:04.845  render           | Mem: 1614M | Sample 0/512 (Using optimized kernels)",
        &mut frame,
    )
    .unwrap();
    assert_eq!(update.sample, "0/512");
    assert_eq!(update.time, "00:04");
    assert_eq!(update.remaining, None);
}

#[test]
fn unrecognized_lines_are_ignored() {
    let mut frame = 2;
    for line in [
        "",
        "Blender 5.0.0 (hash 1234 built 2025-11-01)",
        "Read blend: /tmp/scene.blend",
        "a | b",
        "00:01.000 render | Mem: 10M | Synchronizing object",
        "00:01.000 render | Remaining: 01:00 | Mem: 10M | Updating shaders",
        "Fra:1 Mem:2845.68M (Peak 2845.69M) | Time:00:14.42 | Remaining:03:01.65 | Mem:4360.26M, Peak:4360.26M | Scene, View Layer | Sample 17/256",
        "x | y | z | w | v",
        "00:01.000 render | Mem: 10M | Samples 4/16",
    ] {
        assert_eq!(parse_line(line, &mut frame), None, "line: {line:?}");
    }
    assert_eq!(frame, 2);
}

#[test]
fn finished_in_long_line_does_not_advance() {
    let mut frame = 2;
    assert_eq!(
        parse_line("00:01.000 render | Remaining: 00:00 | Mem: 10M | Finished", &mut frame),
        None
    );
    assert_eq!(frame, 2);
}

#[test]
fn saved_path_extracts_quoted_path() {
    assert_eq!(
        saved_path("Saved: '/renders/shot/shot_0001.exr'"),
        Some("/renders/shot/shot_0001.exr")
    );
    assert_eq!(
        saved_path("01:02.000  render | Saved: '/r/a_0002.png'"),
        Some("/r/a_0002.png")
    );
    assert_eq!(saved_path("Saved nothing"), None);
}

use super::*;

#[test]
fn drawn_frames_reach_the_capture_stream_scaled() {
    let mut surface = CpuSurface::default();
    surface.attach(4, 2).unwrap();
    let stream = surface.capture_as_stream().unwrap();
    assert_eq!((stream.width, stream.height), (4, 2));

    surface
        .draw_frame(&Frame::solid(8, 4, [200, 100, 50, 255]), 4, 2)
        .unwrap();
    let captured = stream.frames.try_recv().unwrap();
    assert_eq!((captured.width, captured.height), (4, 2));
    assert_eq!(captured.data.len(), 4 * 2 * 4);
    assert_eq!(&captured.data[..4], &[200, 100, 50, 255]);
}

#[test]
fn release_ends_the_capture_stream() {
    let mut surface = CpuSurface::default();
    surface.attach(2, 2).unwrap();
    let stream = surface.capture_as_stream().unwrap();
    surface.release();
    assert!(!surface.is_attached());
    assert!(stream.frames.recv().is_err());
}

#[test]
fn drawing_requires_attachment_and_matching_size() {
    let mut surface = CpuSurface::default();
    let frame = Frame::solid(2, 2, [0, 0, 0, 255]);
    assert!(surface.draw_frame(&frame, 2, 2).is_err());

    surface.attach(2, 2).unwrap();
    assert!(surface.draw_frame(&frame, 4, 4).is_err());
    assert!(surface.draw_frame(&frame, 2, 2).is_ok());
}

#[test]
fn one_stream_per_attachment() {
    let mut surface = CpuSurface::default();
    surface.attach(2, 2).unwrap();
    let _stream = surface.capture_as_stream().unwrap();
    assert!(surface.capture_as_stream().is_err());
    assert!(surface.attach(2, 2).is_err());
}

#[test]
fn mismatched_frame_buffer_is_rejected() {
    assert!(Frame::new(2, 2, vec![0; 3]).is_err());
    assert!(Frame::new(2, 2, vec![0; 16]).is_ok());
}

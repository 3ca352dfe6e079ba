use akonadi_ipc::{
    IpcError,
    framing::{MAX_FRAME_SIZE, read_frame, read_frame_or_eof, write_frame},
};
use tokio::io::{AsyncWriteExt, duplex, sink};

#[tokio::test]
async fn frames_arrive_in_write_order() {
    let (mut tx, mut rx) = duplex(128);

    let write_task = tokio::spawn(async move {
        write_frame(&mut tx, b"login").await?;
        write_frame(&mut tx, b"fetch").await
    });

    assert_eq!(read_frame(&mut rx).await.expect("first frame"), b"login");
    assert_eq!(read_frame(&mut rx).await.expect("second frame"), b"fetch");

    write_task
        .await
        .expect("join should succeed")
        .expect("write should succeed");
}

#[tokio::test]
async fn reject_oversized_frame() {
    let mut writer = sink();
    let payload = vec![0_u8; (MAX_FRAME_SIZE + 1) as usize];

    let err = write_frame(&mut writer, &payload)
        .await
        .expect_err("oversized frame must fail");

    match err {
        IpcError::FrameTooLarge { .. } => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn reject_oversized_header_on_read() {
    let (mut tx, mut rx) = duplex(16);
    tx.write_all(&(MAX_FRAME_SIZE + 1).to_be_bytes())
        .await
        .expect("header write should succeed");

    let err = read_frame(&mut rx).await.expect_err("oversized header must fail");
    assert!(matches!(err, IpcError::FrameTooLarge { .. }));
}

#[tokio::test]
async fn clean_close_between_frames_is_not_an_error() {
    let (mut tx, mut rx) = duplex(64);
    write_frame(&mut tx, b"bye").await.expect("write");
    drop(tx);

    let first = read_frame_or_eof(&mut rx).await.expect("first read");
    assert_eq!(first.as_deref(), Some(&b"bye"[..]));
    let second = read_frame_or_eof(&mut rx).await.expect("second read");
    assert!(second.is_none());
}

#[tokio::test]
async fn detect_truncated_frame_payload() {
    let (mut tx, mut rx) = duplex(128);

    tx.write_all(&(8_u32.to_be_bytes()))
        .await
        .expect("header write should succeed");
    tx.write_all(b"abc")
        .await
        .expect("partial payload write should succeed");
    drop(tx);

    let err = read_frame_or_eof(&mut rx)
        .await
        .expect_err("truncated frame should fail");

    assert!(err.is_disconnect());
    match err {
        IpcError::Io(io_err) => {
            assert_eq!(io_err.kind(), std::io::ErrorKind::UnexpectedEof);
        }
        other => panic!("unexpected error: {other}"),
    }
}

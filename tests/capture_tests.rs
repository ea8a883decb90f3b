// Tests for the capture pipeline: segmentation into fixed-size frames,
// PCM16 encoding, mute semantics, frame conditioning, and best-effort
// behavior under backpressure.

mod common;

use std::time::Duration;

use common::{DeniedCapture, PushCapture};
use lingo_voice::codec::{encode_f32_to_pcm16, EncodedChunk};
use lingo_voice::{AudioFrame, CaptureConfig, CapturePipeline, VoiceError};
use tokio::time::timeout;

fn mic_frame(samples: Vec<f32>, sample_rate: u32, channels: u16) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate,
        channels,
    }
}

async fn next_chunk(rx: &mut tokio::sync::mpsc::Receiver<EncodedChunk>) -> EncodedChunk {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a chunk")
        .expect("chunk channel closed")
}

#[tokio::test]
async fn three_frames_produce_three_encoded_sends() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());
    let (backend, frames) = PushCapture::new();
    let mut chunks = pipeline.start(Box::new(backend)).await.unwrap();

    let samples: Vec<f32> = (0..4096).map(|i| ((i % 100) as f32 - 50.0) / 64.0).collect();
    let expected = encode_f32_to_pcm16(&samples);

    for _ in 0..3 {
        frames
            .send(mic_frame(samples.clone(), 16000, 1))
            .await
            .unwrap();
    }

    for _ in 0..3 {
        let chunk = next_chunk(&mut chunks).await;
        assert_eq!(chunk.mime, "audio/pcm;rate=16000");
        assert_eq!(chunk.bytes.len(), 4096 * 2);
        assert_eq!(chunk.bytes, expected);
    }

    assert_eq!(pipeline.frames_sent(), 3);
    assert_eq!(pipeline.frames_dropped(), 0);
}

#[tokio::test]
async fn muted_frames_are_dropped_not_buffered() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());
    let (backend, frames) = PushCapture::new();
    let mut chunks = pipeline.start(Box::new(backend)).await.unwrap();

    frames
        .send(mic_frame(vec![0.1; 4096], 16000, 1))
        .await
        .unwrap();
    next_chunk(&mut chunks).await;

    pipeline.set_muted(true);
    assert!(pipeline.is_muted());

    frames
        .send(mic_frame(vec![0.2; 4096], 16000, 1))
        .await
        .unwrap();
    frames
        .send(mic_frame(vec![0.3; 4096], 16000, 1))
        .await
        .unwrap();

    // Nothing comes out while muted.
    assert!(timeout(Duration::from_millis(200), chunks.recv())
        .await
        .is_err());

    pipeline.set_muted(false);
    frames
        .send(mic_frame(vec![0.4; 4096], 16000, 1))
        .await
        .unwrap();

    let chunk = next_chunk(&mut chunks).await;
    assert_eq!(chunk.bytes, encode_f32_to_pcm16(&vec![0.4f32; 4096]));
    assert_eq!(pipeline.frames_sent(), 2);
}

#[tokio::test]
async fn partial_accumulation_is_discarded_with_muted_frames() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());
    let (backend, frames) = PushCapture::new();
    let mut chunks = pipeline.start(Box::new(backend)).await.unwrap();

    // Half a frame, then mute while more audio arrives.
    frames
        .send(mic_frame(vec![0.1; 2048], 16000, 1))
        .await
        .unwrap();
    pipeline.set_muted(true);
    frames
        .send(mic_frame(vec![0.2; 2048], 16000, 1))
        .await
        .unwrap();
    pipeline.set_muted(false);

    // The next full frame stands alone; the pre-mute half is gone.
    frames
        .send(mic_frame(vec![0.5; 4096], 16000, 1))
        .await
        .unwrap();

    let chunk = next_chunk(&mut chunks).await;
    assert_eq!(chunk.bytes, encode_f32_to_pcm16(&vec![0.5f32; 4096]));
}

#[tokio::test]
async fn oversized_device_frames_are_split_into_fixed_frames() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());
    let (backend, frames) = PushCapture::new();
    let mut chunks = pipeline.start(Box::new(backend)).await.unwrap();

    // One big device callback covering two outbound frames.
    frames
        .send(mic_frame(vec![0.25; 8192], 16000, 1))
        .await
        .unwrap();

    let first = next_chunk(&mut chunks).await;
    let second = next_chunk(&mut chunks).await;
    assert_eq!(first.bytes.len(), 8192);
    assert_eq!(second.bytes.len(), 8192);
}

#[tokio::test]
async fn high_rate_device_frames_are_decimated_to_target() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());
    let (backend, frames) = PushCapture::new();
    let mut chunks = pipeline.start(Box::new(backend)).await.unwrap();

    // 48kHz device: every third sample survives, 12288 -> 4096.
    frames
        .send(mic_frame(vec![0.25; 12288], 48000, 1))
        .await
        .unwrap();

    let chunk = next_chunk(&mut chunks).await;
    assert_eq!(chunk.bytes, encode_f32_to_pcm16(&vec![0.25f32; 4096]));
}

#[tokio::test]
async fn stereo_device_frames_fold_to_mono() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());
    let (backend, frames) = PushCapture::new();
    let mut chunks = pipeline.start(Box::new(backend)).await.unwrap();

    // L/R cancel out to silence after the fold.
    let mut interleaved = Vec::with_capacity(8192);
    for _ in 0..4096 {
        interleaved.push(0.5);
        interleaved.push(-0.5);
    }
    frames
        .send(mic_frame(interleaved, 16000, 2))
        .await
        .unwrap();

    let chunk = next_chunk(&mut chunks).await;
    assert_eq!(chunk.bytes, encode_f32_to_pcm16(&vec![0.0f32; 4096]));
}

#[tokio::test]
async fn backpressure_drops_frames_instead_of_blocking() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());
    let (backend, frames) = PushCapture::new();
    let chunks = pipeline.start(Box::new(backend)).await.unwrap();

    // Nobody reads `chunks`, so the outbound queue (capacity 16) fills
    // and the rest must be dropped without the pump ever blocking.
    for _ in 0..20 {
        frames
            .send(mic_frame(vec![0.1; 4096], 16000, 1))
            .await
            .unwrap();
    }

    timeout(Duration::from_secs(2), async {
        while pipeline.frames_sent() + pipeline.frames_dropped() < 20 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pump never processed all frames");

    assert_eq!(pipeline.frames_sent(), 16);
    assert_eq!(pipeline.frames_dropped(), 4);
    drop(chunks);
}

#[tokio::test]
async fn microphone_denial_aborts_pipeline_start() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());

    let err = pipeline.start(Box::new(DeniedCapture)).await.unwrap_err();
    assert!(matches!(err, VoiceError::CaptureUnavailable(_)));
}

#[tokio::test]
async fn stop_releases_the_backend() {
    let pipeline = CapturePipeline::new(CaptureConfig::default());
    let (backend, frames) = PushCapture::new();
    let _chunks = pipeline.start(Box::new(backend)).await.unwrap();

    pipeline.stop().await;

    // The pump is gone; feeding more frames goes nowhere and stop is
    // safe to repeat.
    let _ = frames.try_send(mic_frame(vec![0.1; 4096], 16000, 1));
    pipeline.stop().await;
}

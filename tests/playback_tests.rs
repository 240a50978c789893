// Scheduling tests for the playback timeline
//
// These run under a paused tokio clock so schedule math is exact: no
// overlap, gapless back-to-back playback, late chunks starting at
// arrival time, and interruption resetting the cursor.

use std::sync::Arc;
use std::time::Duration;

use fala_live::playback::decode_pcm16;
use fala_live::{DecodeError, NullSink, PlaybackScheduler};
use tokio::time::Instant;

const OUTPUT_RATE: u32 = 24000;

/// PCM16 payload of silence with the given duration at the output rate.
fn pcm_ms(ms: u64) -> Vec<u8> {
    vec![0u8; (OUTPUT_RATE as u64 * ms / 1000 * 2) as usize]
}

fn scheduler() -> (PlaybackScheduler, Arc<NullSink>) {
    let sink = Arc::new(NullSink::new());
    (PlaybackScheduler::new(OUTPUT_RATE, sink.clone()), sink)
}

#[tokio::test(start_paused = true)]
async fn test_chunks_play_back_to_back_without_gap() {
    let (scheduler, _sink) = scheduler();
    let t0 = Instant::now();

    let first = scheduler.enqueue(&pcm_ms(250)).await.unwrap();
    let second = scheduler.enqueue(&pcm_ms(250)).await.unwrap();

    assert_eq!(first.start, t0, "First chunk starts immediately");
    assert_eq!(first.end, t0 + Duration::from_millis(250));
    assert_eq!(second.start, first.end, "No artificial gap between chunks");
    assert_eq!(second.end, t0 + Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_second_chunk_waits_for_first() {
    // 250ms chunks enqueued at t=0 and t=100ms: the second must start at
    // t=250ms, not t=100ms.
    let (scheduler, _sink) = scheduler();
    let t0 = Instant::now();

    let first = scheduler.enqueue(&pcm_ms(250)).await.unwrap();
    tokio::time::advance(Duration::from_millis(100)).await;
    let second = scheduler.enqueue(&pcm_ms(250)).await.unwrap();

    assert_eq!(second.start, first.end);
    assert_eq!(second.start.duration_since(t0), Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_late_chunk_starts_at_arrival_time() {
    let (scheduler, _sink) = scheduler();

    let first = scheduler.enqueue(&pcm_ms(50)).await.unwrap();
    tokio::time::advance(Duration::from_millis(200)).await;
    let second = scheduler.enqueue(&pcm_ms(50)).await.unwrap();

    let now = Instant::now();
    assert_eq!(second.start, now, "Late chunk is never scheduled in the past");
    assert!(second.start >= first.end);
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_intervals_never_overlap() {
    let (scheduler, _sink) = scheduler();

    let mut previous_end = None;
    for (duration_ms, advance_ms) in [(100, 0), (30, 10), (250, 500), (40, 0), (40, 20)] {
        tokio::time::advance(Duration::from_millis(advance_ms)).await;
        let schedule = scheduler.enqueue(&pcm_ms(duration_ms)).await.unwrap();

        if let Some(end) = previous_end {
            assert!(schedule.start >= end, "Chunk intervals must not intersect");
        }
        previous_end = Some(schedule.end);
    }
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_cancels_pending_and_resets_cursor() {
    let (scheduler, sink) = scheduler();

    scheduler.enqueue(&pcm_ms(250)).await.unwrap();
    scheduler.enqueue(&pcm_ms(250)).await.unwrap();
    assert_eq!(scheduler.pending_len().await, 2);

    // The first chunk starts immediately; let it reach the sink so the
    // play counts below are deterministic.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(sink.played(), 1);

    scheduler.interrupt().await;
    assert_eq!(scheduler.pending_len().await, 0, "Pending set cleared");

    // The cursor restarted at the current time: a new chunk plays
    // immediately instead of queueing behind discarded audio.
    tokio::time::advance(Duration::from_millis(10)).await;
    let now = Instant::now();
    let next = scheduler.enqueue(&pcm_ms(100)).await.unwrap();
    assert_eq!(next.start, now);

    // The aborted second chunk is never replayed, only the new one plays.
    tokio::time::advance(Duration::from_millis(500)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(sink.played(), 2, "Interrupted chunk never reached the sink");
}

#[tokio::test(start_paused = true)]
async fn test_chunk_untracked_after_completion() {
    let (scheduler, sink) = scheduler();

    scheduler.enqueue(&pcm_ms(100)).await.unwrap();
    assert_eq!(scheduler.pending_len().await, 1);

    tokio::time::advance(Duration::from_millis(150)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(scheduler.pending_len().await, 0, "Completed chunk untracked");
    assert_eq!(sink.played(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payloads_are_rejected_without_advancing_cursor() {
    let (scheduler, _sink) = scheduler();

    assert_eq!(scheduler.enqueue(&[]).await.unwrap_err(), DecodeError::Empty);
    assert_eq!(
        scheduler.enqueue(&[1, 2, 3]).await.unwrap_err(),
        DecodeError::TruncatedSample(3)
    );
    assert_eq!(scheduler.pending_len().await, 0);

    // The timeline is untouched: the next good chunk starts now.
    let t0 = Instant::now();
    let schedule = scheduler.enqueue(&pcm_ms(100)).await.unwrap();
    assert_eq!(schedule.start, t0);
}

#[test]
fn test_decode_pcm16_little_endian() {
    let samples = decode_pcm16(&[0x01, 0x00, 0xFF, 0x7F, 0x00, 0x80]).unwrap();
    assert_eq!(samples, vec![1, i16::MAX, i16::MIN]);
}

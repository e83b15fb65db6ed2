use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use rand::Rng;

use super::*;

#[test]
fn test_gate_array_starts_closed() -> Result<()> {
    let gates = GateArray::new(10)?;
    assert_eq!(gates.capacity(), 10);

    for i in 0..gates.capacity() {
        assert!(!gates.is_open(i)?, "gate {i} should start closed");
        assert!(!gates.try_close(i)?, "closed gate {i} must not be won");
    }

    Ok(())
}

#[test]
fn test_gate_array_zero_capacity() {
    assert!(matches!(GateArray::new(0), Err(Error::ErrZeroCapacity)));
}

#[test]
fn test_gate_array_first_close_wins() -> Result<()> {
    let gates = GateArray::new(4)?;
    gates.open_all();

    assert!(gates.try_close(2)?);
    for _ in 0..5 {
        assert!(!gates.try_close(2)?);
    }

    // other tracks are untouched
    assert!(gates.is_open(0)?);
    assert!(gates.is_open(1)?);
    assert!(gates.is_open(3)?);

    gates.open_all();
    assert!(gates.try_close(2)?);
    assert!(!gates.try_close(2)?);

    Ok(())
}

#[test]
fn test_gate_array_open_all_idempotent() -> Result<()> {
    let gates = GateArray::new(3)?;
    gates.open_all();
    gates.open_all();

    for i in 0..3 {
        assert!(gates.is_open(i)?);
    }

    // a double reset does not hand out a second win
    assert!(gates.try_close(1)?);
    assert!(!gates.try_close(1)?);

    Ok(())
}

#[test]
fn test_gate_array_out_of_bounds() -> Result<()> {
    let gates = GateArray::new(2)?;
    gates.open_all();

    for index in [2usize, 3, 10, usize::MAX] {
        match gates.try_close(index) {
            Err(Error::ErrTrackIndexOutOfBounds {
                index: got,
                capacity,
            }) => {
                assert_eq!(got, index);
                assert_eq!(capacity, 2);
            }
            other => panic!("expected out of bounds for {index}, got {other:?}"),
        }
        assert!(gates.is_open(index).is_err());
    }

    // the in-range gates were not touched by the rejected calls
    assert!(gates.is_open(0)?);
    assert!(gates.is_open(1)?);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_gate_array_concurrent_single_winner() -> Result<()> {
    const TRACKS: usize = 8;
    const CALLERS: usize = 16;
    const ROUNDS: usize = 50;

    let gates = Arc::new(GateArray::new(TRACKS)?);

    for _ in 0..ROUNDS {
        gates.open_all();

        let wins: Arc<Vec<AtomicUsize>> =
            Arc::new((0..TRACKS).map(|_| AtomicUsize::new(0)).collect());
        let mut handles = vec![];
        for _ in 0..CALLERS {
            let gates = Arc::clone(&gates);
            let wins = Arc::clone(&wins);
            handles.push(tokio::spawn(async move {
                for track in 0..TRACKS {
                    if gates.try_close(track).unwrap() {
                        wins[track].fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        for (track, w) in wins.iter().enumerate() {
            assert_eq!(w.load(Ordering::SeqCst), 1, "track {track}");
            assert!(!gates.is_open(track)?);
        }
    }

    Ok(())
}

// Randomized interleavings of resets and closes. Between two resets issued
// by the single resetter, each track may be won at most once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_gate_array_randomized_interleavings() -> Result<()> {
    const TRACKS: usize = 6;
    const CLOSERS: usize = 8;
    const RESETS: usize = 200;

    let gates = Arc::new(GateArray::new(TRACKS)?);
    // epoch is bumped by the resetter right after each open_all
    let epoch = Arc::new(AtomicUsize::new(0));
    let wins = Arc::new(std::sync::Mutex::new(Vec::<(usize, usize)>::new()));

    let resetter = {
        let gates = Arc::clone(&gates);
        let epoch = Arc::clone(&epoch);
        tokio::spawn(async move {
            for _ in 0..RESETS {
                let pause = rand::rng().random_range(0..50u64);
                tokio::time::sleep(std::time::Duration::from_micros(pause)).await;
                gates.open_all();
                epoch.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    let mut closers = vec![];
    for _ in 0..CLOSERS {
        let gates = Arc::clone(&gates);
        let epoch = Arc::clone(&epoch);
        let wins = Arc::clone(&wins);
        closers.push(tokio::spawn(async move {
            for _ in 0..2_000 {
                let track = rand::rng().random_range(0..TRACKS);
                if gates.try_close(track).unwrap() {
                    let e = epoch.load(Ordering::SeqCst);
                    wins.lock().unwrap().push((track, e));
                }
                let yield_now = rand::rng().random_bool(0.3);
                if yield_now {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }

    resetter.await.unwrap();
    for c in closers {
        c.await.unwrap();
    }

    let wins = wins.lock().unwrap();
    let resets = epoch.load(Ordering::SeqCst);
    assert_eq!(resets, RESETS);

    // A win observed with epoch e happened after reset e-1 opened the gate,
    // or during reset e's open_all before the epoch bump. Either way a track
    // cannot collect more wins than resets.
    for track in 0..TRACKS {
        let n = wins.iter().filter(|(t, _)| *t == track).count();
        assert!(n <= RESETS, "track {track} won {n} times over {RESETS} resets");
    }

    // once the racing stops, a fresh reset hands out exactly one win per track
    gates.open_all();
    for track in 0..TRACKS {
        assert!(gates.try_close(track)?);
        assert!(!gates.try_close(track)?);
    }

    Ok(())
}

//! Tickflow demonstration driver.
//!
//! Runs the synthetic producer -> SPSC ring -> consumer pipeline with a
//! periodic reporter, pinning data-plane threads to isolated cores when
//! the kernel provides them.
//!
//! Usage: tickflow-driver [duration_seconds]   (default 10, Ctrl-C to stop)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tickflow::config::FeedConfig;
use tickflow::cpu;
use tickflow::event::{EventType, MarketEvent, Side, Symbol, PRICE_SCALE};
use tickflow::metrics::FeedMetrics;
use tickflow::observe;
use tickflow::pool::ObjectPool;
use tickflow::queue::{MpmcQueue, SpscRing};
use tickflow::time;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);
const VENUE_ID: u32 = 1;

fn main() {
    tracing_subscriber::fmt::init();

    let duration_secs = match parse_args() {
        Ok(secs) => secs,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("Usage: tickflow-driver [duration_seconds]");
            std::process::exit(1);
        }
    };

    println!("=== Tickflow Market Data Feed Handler ===");

    // Calibration must finish before any latency is recorded.
    let tsc_hz = time::calibrate();
    println!("Cycle counter frequency: {tsc_hz} Hz");

    let num_cpus = cpu::num_cpus();
    println!("Online CPUs: {num_cpus}");

    let isolated = cpu::isolated_cpus();
    if isolated.is_empty() {
        println!("Warning: no isolated CPUs; for best latency boot with isolcpus=");
    } else {
        println!("Isolated CPUs: {isolated:?}");
    }

    self_check();

    let producer_cpu = isolated.first().copied().unwrap_or(0);
    let consumer_cpu = isolated
        .get(1)
        .copied()
        .unwrap_or(if num_cpus > 1 { 1 } else { 0 });

    let config = FeedConfig::new().with_placement(producer_cpu, consumer_cpu);

    let ring = match SpscRing::<MarketEvent>::new(config.ring_capacity) {
        Ok(ring) => Arc::new(ring),
        Err(e) => {
            eprintln!("Failed to create event ring: {e}");
            std::process::exit(1);
        }
    };

    let metrics = Arc::new(FeedMetrics::new());
    let stop = Arc::new(AtomicBool::new(false));

    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)).ok();
    }

    println!("\nRunning for {duration_secs} seconds (Ctrl-C to stop early)...\n");

    let producer = {
        let ring = ring.clone();
        let metrics = metrics.clone();
        let stop = stop.clone();
        let cfg = config.clone();
        thread::spawn(move || producer_loop(&ring, &metrics, &stop, &cfg))
    };

    let consumer = {
        let ring = ring.clone();
        let metrics = metrics.clone();
        let stop = stop.clone();
        let cfg = config.clone();
        thread::spawn(move || consumer_loop(&ring, &metrics, &stop, &cfg))
    };

    let reporter = {
        let metrics = metrics.clone();
        let stop = stop.clone();
        thread::spawn(move || reporter_loop(&metrics, &stop))
    };

    // Timed run, woken early by Ctrl-C.
    let mut remaining = Duration::from_secs(duration_secs);
    while remaining > Duration::ZERO && !stop.load(Ordering::Relaxed) {
        let step = remaining.min(Duration::from_millis(100));
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }

    println!("\nShutting down...");
    stop.store(true, Ordering::SeqCst);

    let produced = producer.join().expect("producer thread panicked");
    let processed = consumer.join().expect("consumer thread panicked");
    reporter.join().expect("reporter thread panicked");

    println!("Producer pushed {produced} events; consumer drained {processed}.");
    print_final_report(&metrics);
}

fn parse_args() -> Result<u64, String> {
    let mut args = std::env::args().skip(1);
    match args.next() {
        None => Ok(10),
        Some(arg) => arg
            .parse::<u64>()
            .map_err(|_| format!("invalid duration: {arg:?}")),
    }
}

/// Exercise the MPMC queue and the object pool once at startup so a
/// broken build fails before the timed run.
fn self_check() {
    println!("\n--- Startup self-check ---");

    let queue = MpmcQueue::<u64>::new(1024).expect("mpmc queue");
    for i in 0..100 {
        assert!(queue.try_enqueue(i));
    }
    let mut count = 0u64;
    while queue.try_dequeue().is_some() {
        count += 1;
    }
    println!("MPMC queue: {count}/100 round-tripped, empty={}", queue.empty());

    let pool = ObjectPool::<MarketEvent>::new(1024, true).expect("event pool");
    let p = pool.allocate(MarketEvent::default()).expect("pool slot");
    unsafe { pool.deallocate(p) };
    println!(
        "Object pool: {} slots of {} bytes, large_pages={}",
        pool.capacity(),
        pool.slot_size(),
        pool.using_large_pages()
    );

    println!(
        "MarketEvent: {} bytes, align {}",
        std::mem::size_of::<MarketEvent>(),
        std::mem::align_of::<MarketEvent>()
    );
    println!("--- Self-check passed ---\n");
}

fn place_thread(name: &str, cpu_id: Option<usize>, rt_priority: Option<i32>) {
    if let Err(e) = cpu::set_thread_name(name) {
        eprintln!("[{name}] thread naming unavailable: {e}");
    }
    if let Some(id) = cpu_id {
        match cpu::pin_to_cpu(id) {
            Ok(()) => println!("[{name}] pinned to CPU {id}"),
            Err(e) => eprintln!("[{name}] running unpinned: {e}"),
        }
    }
    if let Some(prio) = rt_priority {
        if let Err(e) = cpu::set_realtime_fifo(prio) {
            eprintln!("[{name}] running without SCHED_FIFO: {e}");
        }
    }
}

fn producer_loop(
    ring: &SpscRing<MarketEvent>,
    metrics: &FeedMetrics,
    stop: &AtomicBool,
    config: &FeedConfig,
) -> u64 {
    place_thread("producer", config.producer_cpu, config.rt_priority);

    let mut sequence = 0u64;
    'produce: while !stop.load(Ordering::Relaxed) {
        sequence += 1;

        let mut ev = MarketEvent::default();
        ev.venue_id = VENUE_ID;
        ev.sequence_number = sequence;
        ev.event_type = EventType::Trade;
        ev.side = Side::Bid;
        ev.symbol = Symbol::new("AAPL");
        ev.price = 150 * PRICE_SCALE;
        ev.quantity = 100 * PRICE_SCALE;
        ev.exchange_timestamp = time::now_ns();
        ev.receive_timestamp = time::cycles_now();

        // Retry the same event: the synthetic feed is gapless.
        while !ring.try_push(ev) {
            if stop.load(Ordering::Relaxed) {
                sequence -= 1;
                break 'produce;
            }
            metrics.record_queue_full();
            observe::record_backpressure();
            cpu::cpu_pause();
        }
        metrics.record_message_received();
        observe::record_publish(1);

        // Pace to roughly 1M events/sec.
        if sequence % 1000 == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }
    sequence
}

fn consumer_loop(
    ring: &SpscRing<MarketEvent>,
    metrics: &FeedMetrics,
    stop: &AtomicBool,
    config: &FeedConfig,
) -> u64 {
    place_thread("consumer", config.consumer_cpu, config.rt_priority);

    let mut processed = 0u64;
    let mut last_sequence = 0u64;

    // Keep draining after the stop flag so shutdown loses nothing.
    while !stop.load(Ordering::Relaxed) || !ring.empty() {
        match ring.try_pop() {
            Some(ev) => {
                let latency_cycles = time::cycles_now().wrapping_sub(ev.receive_timestamp);
                metrics
                    .end_to_end_latency
                    .record(time::cycles_to_ns(latency_cycles));

                if processed > 0 && ev.sequence_number != last_sequence + 1 {
                    metrics.record_sequence_gap();
                    observe::record_gap(last_sequence + 1, ev.sequence_number);
                }
                last_sequence = ev.sequence_number;

                metrics.record_message_processed();
                observe::record_consume(1);
                processed += 1;
            }
            None => cpu::cpu_pause(),
        }
    }
    processed
}

fn reporter_loop(metrics: &FeedMetrics, stop: &AtomicBool) {
    let _ = cpu::set_thread_name("reporter");

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(REPORT_INTERVAL);
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let snap = metrics.snapshot();
        let hist = &metrics.end_to_end_latency;
        if hist.count() > 0 {
            println!(
                "{snap} | e2e us: p50={} p99={} p99.9={} max={}",
                hist.p50() / 1000,
                hist.p99() / 1000,
                hist.p999() / 1000,
                hist.max() / 1000
            );
        } else {
            println!("{snap}");
        }
    }
}

fn print_final_report(metrics: &FeedMetrics) {
    let snap = metrics.snapshot();
    println!("\n=== Final Statistics ===");
    println!("Received:   {}", snap.messages_received);
    println!("Processed:  {}", snap.messages_processed);
    println!("Dropped:    {}", snap.messages_dropped);
    println!("Gaps:       {}", snap.sequence_gaps);
    println!("Queue full: {}", snap.queue_full_events);

    let hist = &metrics.end_to_end_latency;
    if hist.count() > 0 {
        println!("\nEnd-to-end latency (microseconds):");
        println!("  Count:  {}", hist.count());
        println!("  Min:    {}", hist.min() / 1000);
        println!("  p50:    {}", hist.p50() / 1000);
        println!("  p99:    {}", hist.p99() / 1000);
        println!("  p99.9:  {}", hist.p999() / 1000);
        println!("  p99.99: {}", hist.p9999() / 1000);
        println!("  Max:    {}", hist.max() / 1000);
        println!("  Mean:   {}", hist.mean() / 1000);
    }
    println!("\n=== Shutdown complete ===");
}

use std::sync::{Arc, Mutex};

use montage_common::error::MontageError;
use montage_processing_core::{Job, ProcessingQueue};
use proptest::prelude::*;

fn run_queue(jobs: &[(u8, bool)]) -> (Vec<usize>, Vec<f64>, ProcessingQueue) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build");

    runtime.block_on(async {
        let order = Arc::new(Mutex::new(Vec::new()));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let queue = ProcessingQueue::with_progress(move |p| sink.lock().unwrap().push(p));

        for (i, &(weight, fails)) in jobs.iter().enumerate() {
            let order = order.clone();
            queue.enqueue(
                Job::new(weight as f64, move || async move {
                    order.lock().unwrap().push(i);
                    tokio::task::yield_now().await;
                    if fails {
                        Err(MontageError::job(format!("job {i} failed")))
                    } else {
                        Ok(())
                    }
                })
                .with_label(format!("job-{i}")),
            );
        }
        queue.wait_idle().await;

        let order = order.lock().unwrap().clone();
        let reports = reports.lock().unwrap().clone();
        (order, reports, queue)
    })
}

proptest! {
    #[test]
    fn every_job_runs_once_in_enqueue_order(
        jobs in prop::collection::vec((1u8..50, any::<bool>()), 0..24)
    ) {
        let (order, _, queue) = run_queue(&jobs);
        prop_assert_eq!(order, (0..jobs.len()).collect::<Vec<_>>());

        let stats = queue.stats();
        let failures = jobs.iter().filter(|(_, fails)| *fails).count() as u64;
        prop_assert_eq!(stats.failed, failures);
        prop_assert_eq!(stats.completed, jobs.len() as u64 - failures);
        prop_assert!(!stats.is_processing);
    }

    #[test]
    fn progress_accumulates_successful_weights_only(
        jobs in prop::collection::vec((1u8..50, any::<bool>()), 1..24)
    ) {
        let (_, reports, queue) = run_queue(&jobs);

        let mut expected = Vec::new();
        let mut total = 0.0;
        for &(weight, fails) in &jobs {
            if !fails {
                total += weight as f64;
                expected.push(total);
            }
        }
        prop_assert_eq!(reports, expected);
        prop_assert_eq!(queue.progress(), total);
    }
}

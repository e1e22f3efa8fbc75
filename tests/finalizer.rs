#[cfg(test)]
mod tests {
    use settle::{
        BusyWaitFinalizer, Error, FinalizeError, FinalizerConfig, NativeTransaction,
        TransactionFinalizer,
    };
    use settle_tests::{
        ForeignTransaction, ScriptedHandle, ScriptedTransaction, init_logs, silent_logs,
    };
    use std::{
        sync::atomic::Ordering,
        thread,
        time::{Duration, Instant},
    };
    use uuid::Uuid;

    type Finalizer = BusyWaitFinalizer<ScriptedHandle, ScriptedTransaction>;

    fn config(poll_interval_ms: u64, max_poll_iterations: u32) -> FinalizerConfig {
        FinalizerConfig::new(Duration::from_millis(poll_interval_ms), max_poll_iterations)
    }

    #[test]
    fn commit_idle_connection() {
        init_logs();
        let handle = ScriptedHandle::idle();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, FinalizerConfig::default());
        finalizer
            .commit(&Uuid::new_v4())
            .expect("Could not commit the transaction");
        assert_eq!(probe.transaction.polls(), 1, "Expected no wait");
        assert_eq!(probe.calls.commit.load(Ordering::SeqCst), 1);
        assert_eq!(probe.calls.finalizations(), 1);
        assert!(probe.transaction.is_completed());
    }

    #[test]
    fn commit_waits_for_the_connection() {
        init_logs();
        let handle = ScriptedHandle::new(3);
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, config(5, 40));
        let started = Instant::now();
        finalizer
            .commit(&Uuid::new_v4())
            .expect("Could not commit the transaction");
        assert!(started.elapsed() >= Duration::from_millis(15));
        // One poll per wait, then the one that found the connection idle
        assert_eq!(probe.transaction.polls(), 4);
        assert_eq!(probe.calls.commit.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn commit_after_max_poll_iterations() {
        init_logs();
        let handle = ScriptedHandle::busy_forever();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, config(5, 2));
        silent_logs! {
            finalizer
                .commit(&Uuid::new_v4())
                .expect("Could not commit the transaction");
        }
        assert_eq!(probe.transaction.polls(), 3, "Expected exactly 2 waits");
        assert_eq!(probe.calls.commit.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wait_is_bounded() {
        init_logs();
        let handle = ScriptedHandle::busy_forever();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, config(10, 5));
        let started = Instant::now();
        silent_logs! {
            finalizer
                .rollback(&Uuid::new_v4(), None)
                .expect("Could not rollback the transaction");
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "Waited only {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "Waited {:?}", elapsed);
        assert_eq!(probe.calls.rollback.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_iterations_do_not_wait() {
        let handle = ScriptedHandle::busy_forever();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, config(1000, 0));
        let started = Instant::now();
        silent_logs! {
            finalizer
                .commit(&Uuid::new_v4())
                .expect("Could not commit the transaction");
        }
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(probe.calls.commit.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn completed_transaction_is_not_finalized() {
        init_logs();
        let handle = ScriptedHandle::busy_forever();
        let probe = handle.probe();
        probe.transaction.mark_completed();
        let mut finalizer = Finalizer::new(handle, config(1000, 40));
        finalizer
            .commit(&Uuid::new_v4())
            .expect("Commit of a completed transaction must succeed");
        finalizer
            .rollback(&Uuid::new_v4(), None)
            .expect("Rollback of a completed transaction must succeed");
        assert_eq!(probe.transaction.polls(), 0);
        assert_eq!(probe.calls.finalizations(), 0);
    }

    #[test]
    fn disposed_transaction_is_not_finalized() {
        init_logs();
        let handle = ScriptedHandle::idle();
        let probe = handle.probe();
        probe.transaction.mark_disposed();
        let mut finalizer = Finalizer::new(handle, FinalizerConfig::default());
        finalizer
            .rollback(&Uuid::new_v4(), Some(&Error::msg("unit of work failed")))
            .expect("Rollback of a disposed transaction must succeed");
        assert_eq!(probe.calls.finalizations(), 0);
    }

    #[test]
    fn second_commit_is_a_no_op() {
        init_logs();
        let handle = ScriptedHandle::idle();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, FinalizerConfig::default());
        let coordinator = Uuid::new_v4();
        finalizer.commit(&coordinator).expect("First commit");
        finalizer.commit(&coordinator).expect("Second commit");
        finalizer
            .rollback(&coordinator, None)
            .expect("Rollback after commit");
        assert_eq!(probe.calls.commits(), 1);
        assert_eq!(probe.calls.rollbacks(), 0);
    }

    #[test]
    fn disposed_while_waiting() {
        init_logs();
        let handle = ScriptedHandle::busy_forever();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, config(5, 1000));
        let transaction = probe.transaction.clone();
        let disposer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            transaction.mark_disposed();
        });
        let started = Instant::now();
        finalizer
            .commit(&Uuid::new_v4())
            .expect("Commit of a transaction disposed meanwhile must succeed");
        disposer.join().expect("Disposer thread panicked");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(probe.calls.finalizations(), 0);
    }

    #[test]
    fn unexpected_transaction_type() {
        init_logs();
        let handle = ScriptedHandle::busy_forever().foreign();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, config(1000, 40));
        let commit;
        let rollback;
        silent_logs! {
            commit = finalizer
                .commit(&Uuid::new_v4())
                .expect_err("Commit must fail on a foreign transaction");
            rollback = finalizer
                .rollback(&Uuid::new_v4(), None)
                .expect_err("Rollback must fail on a foreign transaction");
        }
        for error in [commit, rollback] {
            let Some(FinalizeError::UnexpectedTransactionType { found, expected }) =
                error.downcast_ref::<FinalizeError>()
            else {
                panic!("Unexpected error: {:#}", error);
            };
            assert_eq!(*found, std::any::type_name::<ForeignTransaction>());
            assert_eq!(*expected, std::any::type_name::<ScriptedTransaction>());
        }
        assert_eq!(probe.transaction.polls(), 0);
        assert_eq!(probe.calls.finalizations(), 0);
    }

    #[test]
    fn missing_transaction() {
        let handle = ScriptedHandle::idle().missing();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, FinalizerConfig::default());
        let error;
        silent_logs! {
            error = finalizer
                .commit(&Uuid::new_v4())
                .expect_err("Commit must fail without a transaction");
        }
        assert!(matches!(
            error.downcast_ref::<FinalizeError>(),
            Some(FinalizeError::UnexpectedTransactionType { found: "<none>", .. })
        ));
        assert_eq!(probe.calls.finalizations(), 0);
    }

    #[test]
    fn driver_errors_pass_through() {
        init_logs();
        let handle = ScriptedHandle::idle().failing("connection reset by peer");
        let mut finalizer = Finalizer::new(handle, FinalizerConfig::default());
        let error = finalizer
            .commit(&Uuid::new_v4())
            .expect_err("The driver rejected the commit");
        assert_eq!(error.to_string(), "connection reset by peer");
        assert!(error.downcast_ref::<FinalizeError>().is_none());
    }

    #[test]
    fn disposed_finalizer_does_not_finalize() {
        init_logs();
        let handle = ScriptedHandle::idle();
        let probe = handle.probe();
        let mut finalizer = Finalizer::new(handle, FinalizerConfig::default());
        finalizer.dispose();
        finalizer
            .commit(&Uuid::new_v4())
            .expect("Commit after dispose must succeed");
        assert!(finalizer.is_disposed());
        assert_eq!(probe.calls.finalizations(), 0);
        assert_eq!(probe.calls.disposals(), 1);
    }
}

use std::fs;

use multichain_deploy::{config::FailurePolicy, runner::Runner};

fn open_descriptors() -> usize {
    fs::read_dir("/proc/self/fd").unwrap().count()
}

#[tokio::test]
async fn pty_endpoints_are_released() {
    let runner = Runner::new("/bin/sh", FailurePolicy::Continue);
    let mut out = Vec::new();

    // Warm up the runtime's signal and process driver before counting.
    runner.run("true", &mut out).await.unwrap();
    let before = open_descriptors();

    for i in 0..20 {
        let command = if i % 2 == 0 {
            format!("echo pass {i}")
        } else {
            format!("echo fail {i} >&2; exit 1")
        };
        runner.run(&command, &mut out).await.unwrap();
    }
    assert!(Runner::new("/nonexistent/shell", FailurePolicy::Continue)
        .run("true", &mut out)
        .await
        .is_err());

    assert_eq!(open_descriptors(), before);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[cfg(unix)]
#[tokio::test]
async fn terminate_kills_a_long_running_child() {
    let mut child = tokio::process::Command::new("sleep")
        .arg("30")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .expect("spawn sleep");

    terminate(&mut child).await;

    let status = child.try_wait().expect("child reaped after terminate");
    assert!(status.is_some(), "child should have exited after SIGTERM");
}

#[cfg(unix)]
#[tokio::test]
async fn terminate_on_an_already_exited_child_is_a_no_op() {
    let mut child = tokio::process::Command::new("true")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .expect("spawn true");

    let _ = child.wait().await;
    terminate(&mut child).await;
}

use std::time::Duration;

use super::*;

fn sh(name: &str, script: &str) -> ProcessSpec {
	ProcessSpec::new(name, "sh").args(["-c", script])
}

#[tokio::test]
async fn test_start_and_stop_long_running_daemon() {
	let mut process = DaemonProcess::launch(sh("snmp", "exec sleep 30")).await.unwrap();
	assert_eq!(process.state(), ProcessState::Running);
	assert!(process.pid().is_some());
	assert!(process.is_alive());

	process.stop(Duration::from_secs(2)).await.unwrap();
	assert!(!process.is_alive());
	assert!(matches!(process.state(), ProcessState::Exited(_)));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
	let mut process = DaemonProcess::launch(sh("snmp", "exec sleep 30")).await.unwrap();
	process.stop(Duration::from_secs(2)).await.unwrap();
	let state = process.state();
	process.stop(Duration::from_secs(2)).await.unwrap();
	assert_eq!(process.state(), state);

	let mut never_started = DaemonProcess::new(sh("agentx", "true"));
	never_started.stop(Duration::from_secs(1)).await.unwrap();
	assert_eq!(never_started.state(), ProcessState::NotStarted);
}

#[tokio::test]
async fn test_sigterm_ignored_escalates_to_kill() {
	let mut process = DaemonProcess::launch(sh("stubborn", "trap '' TERM; while :; do sleep 1; done"))
		.await
		.unwrap();
	process.stop(Duration::from_millis(300)).await.unwrap();
	assert_eq!(process.state(), ProcessState::Killed);
}

#[tokio::test]
async fn test_start_kill_terminates_without_waiting() {
	let mut process = DaemonProcess::launch(sh("snmp", "exec sleep 30")).await.unwrap();
	process.start_kill();
	assert_eq!(process.state(), ProcessState::Killed);

	let status = process.child.as_mut().unwrap().wait().await.unwrap();
	assert!(!status.success());

	// Already killed: a second call leaves the handle alone.
	process.start_kill();
	assert_eq!(process.state(), ProcessState::Killed);

	let mut never_started = DaemonProcess::new(sh("agentx", "true"));
	never_started.start_kill();
	assert_eq!(never_started.state(), ProcessState::NotStarted);
}

#[tokio::test]
async fn test_missing_executable_is_a_launch_error() {
	let err = DaemonProcess::launch(ProcessSpec::new("snmp", "./bin/does-not-exist"))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Launch { .. }));
	assert_eq!(err.process_name(), Some("snmp"));

	let err = DaemonProcess::launch(ProcessSpec::new("snmp", "smith-no-such-binary-on-path"))
		.await
		.unwrap_err();
	assert!(err.to_string().contains("not found on PATH"));
}

#[tokio::test]
async fn test_missing_config_is_a_launch_error() {
	let dir = tempfile::tempdir().unwrap();
	let spec = sh("netsnmp", "exec sleep 30").config(dir.path().join("snmpd.conf"));
	let err = DaemonProcess::launch(spec).await.unwrap_err();
	assert!(err.to_string().contains("config file not found"), "{err}");
}

#[tokio::test]
async fn test_immediate_exit_reports_output() {
	let err = DaemonProcess::launch(sh("snmp", "echo 'bind failed: port 161' >&2; exit 3"))
		.await
		.unwrap_err();
	let message = err.to_string();
	assert!(message.contains("exited during launch with status 3"), "{message}");
	assert!(message.contains("bind failed: port 161"), "{message}");
}

#[tokio::test]
async fn test_config_path_is_passed_to_daemon() {
	let dir = tempfile::tempdir().unwrap();
	let config = dir.path().join("snmp.conf");
	std::fs::write(&config, "rocommunity public\n").unwrap();

	let spec = ProcessSpec::new("snmp", "sh")
		.args(["-c", "cat \"$0\"; exec sleep 30", "{config}"])
		.config(&config);
	let mut process = DaemonProcess::launch(spec).await.unwrap();
	process.stop(Duration::from_secs(2)).await.unwrap();

	let output = process.drain_output().await;
	assert!(output.contains("rocommunity public"), "{output:?}");
}

#[cfg(unix)]
#[tokio::test]
async fn test_external_kill_is_detected() {
	use nix::sys::signal::{Signal, kill};
	use nix::unistd::Pid;

	let mut process = DaemonProcess::launch(sh("agentx", "echo registering; exec sleep 30"))
		.await
		.unwrap();
	let pid = process.pid().unwrap() as i32;
	kill(Pid::from_raw(pid), Signal::SIGKILL).unwrap();

	let mut alive = true;
	for _ in 0..50 {
		alive = process.is_alive();
		if !alive {
			break;
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	assert!(!alive);
	assert_eq!(process.state(), ProcessState::Exited(None));
	assert!(process.drain_output().await.contains("registering"));
}

#[test]
fn test_output_tail_is_bounded() {
	let tail = OutputTail::default();
	tail.push(&vec![b'a'; OUTPUT_LIMIT]);
	tail.push(b"end");
	let snapshot = tail.snapshot();
	assert_eq!(snapshot.len(), OUTPUT_LIMIT);
	assert!(snapshot.ends_with("aend"));
}

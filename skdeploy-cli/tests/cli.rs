use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

/// `spiderkeeper-deploy` isolated from the caller's config and environment.
fn deploy_cmd(home: &Path, cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("spiderkeeper-deploy"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("SKDEPLOY_PASSWORD")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .current_dir(cwd);
    cmd
}

/// Serve one scripted `(status, body)` per connection; report `METHOD path`
/// for each request.
fn stub(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let Ok((stream, _)) = listener.accept() else { return };
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));

            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            let mut length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':') {
                    if k.trim().eq_ignore_ascii_case("content-length") {
                        length = v.trim().parse().unwrap_or(0);
                    }
                }
            }
            let mut request_body = vec![0u8; length];
            reader.read_exact(&mut request_body).expect("body");

            let mut stream = stream;
            let response = format!(
                "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("respond");

            let mut parts = request_line.split_whitespace();
            let summary = format!(
                "{} {}",
                parts.next().unwrap_or_default(),
                parts.next().unwrap_or_default()
            );
            let _ = tx.send(summary);
        }
    });

    (base, rx)
}

/// Requests seen by the stub, in order. Ends once the stub has served its
/// script or has been idle for a few seconds.
fn requests(rx: &mpsc::Receiver<String>) -> Vec<String> {
    std::iter::from_fn(|| rx.recv_timeout(Duration::from_secs(5)).ok()).collect()
}

const PROJECTS: &str = r#"[{"project_id": 3, "project_name": "crawlers"}]"#;

#[test]
fn missing_url_with_no_input_fails() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");

    deploy_cmd(home.path(), work.path())
        .args(["plan", "--no-input", "--jobs", "[]"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("no value for `url`"));
}

#[test]
fn invalid_jobs_json_is_rejected_before_any_request() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");

    deploy_cmd(home.path(), work.path())
        .args([
            "deploy",
            "--no-input",
            "--url",
            "http://127.0.0.1:9",
            "--jobs",
            r#"[{"spider_name": "s1", "minute": ""}]"#,
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("invalid --jobs value"));
}

#[test]
fn zero_timeout_is_rejected_by_argument_parsing() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");

    deploy_cmd(home.path(), work.path())
        .args(["plan", "--no-input", "--timeout", "0", "--jobs", "[]"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("--timeout"));
}

#[test]
fn missing_job_list_is_an_error() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");

    deploy_cmd(home.path(), work.path())
        .args(["plan", "--no-input", "--url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(contains("no job list configured"));
}

#[test]
fn plan_lists_new_job_and_changes_nothing() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let (base, rx) = stub(vec![(200, PROJECTS), (200, "[]")]);

    deploy_cmd(home.path(), work.path())
        .args([
            "plan",
            "--no-input",
            "--url",
            &base,
            "--project",
            "crawlers",
            "--username",
            "admin",
            "--password",
            "secret",
            "--jobs",
            r#"[{"spider_name": "s1", "minute": "5"}]"#,
        ])
        .assert()
        .success()
        .stdout(contains("add").and(contains("s1")).and(contains("1 added")));

    assert_eq!(requests(&rx), ["GET /api/projects", "GET /api/projects/3/jobs"]);
    assert!(!work.path().join("crawlers.egg").exists());
}

#[test]
fn settings_come_from_project_config_file() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let (base, _rx) = stub(vec![(200, PROJECTS), (200, "[]")]);
    fs::write(
        work.path().join("skdeploy.yaml"),
        format!(
            "url: {base}\nproject: crawlers\nusername: admin\npassword: secret\njobs:\n  - spider_name: s1\n    hour: '3'\n"
        ),
    )
    .expect("write config");
    let nested = work.path().join("crawlers");
    fs::create_dir_all(&nested).expect("mkdir");

    let output = deploy_cmd(home.path(), &nested)
        .args(["plan", "--no-input", "--json"])
        .output()
        .expect("run plan");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["project_id"], "3");
    assert_eq!(report["plan"][0]["spider_name"], "s1");
    assert_eq!(report["plan"][0]["hour"], "3");
}

#[test]
fn build_failure_contacts_nobody() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");

    deploy_cmd(home.path(), work.path())
        .args([
            "deploy",
            "--no-input",
            "--url",
            "http://127.0.0.1:9",
            "--project",
            "crawlers",
            "--username",
            "admin",
            "--password",
            "secret",
            "--jobs",
            "[]",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(
            contains("artifact build failed")
                .and(contains("setup.py"))
                .and(contains("no jobs on the scheduler were changed")),
        );
}

#[cfg(unix)]
#[test]
fn failed_delete_reports_possibly_inconsistent_state() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    fs::write(
        work.path().join("setup.py"),
        "printf 'egg' > \"$5/crawlers-1.0.egg\"\n",
    )
    .expect("write setup.py");

    let remote_jobs = r#"[
        {"job_instance_id": 42, "spider_name": "s1", "spider_arguments": null, "priority": 0,
         "desc": null, "run_type": "periodic", "cron_minutes": "5", "cron_hour": "*",
         "cron_day_of_month": "*", "cron_day_of_week": "*", "cron_month": "*"},
        {"job_instance_id": 43, "spider_name": "old", "spider_arguments": null, "priority": 0,
         "desc": null, "run_type": "periodic", "cron_minutes": "0", "cron_hour": "*",
         "cron_day_of_month": "*", "cron_day_of_week": "*", "cron_month": "*"},
        {"job_instance_id": 44, "spider_name": "older", "spider_arguments": null, "priority": 0,
         "desc": null, "run_type": "periodic", "cron_minutes": "1", "cron_hour": "*",
         "cron_day_of_month": "*", "cron_day_of_week": "*", "cron_month": "*"}
    ]"#;
    let (base, rx) = stub(vec![
        (200, PROJECTS),
        (200, "{}"),
        (200, remote_jobs),
        (200, "{}"),
        (500, "{}"),
    ]);

    deploy_cmd(home.path(), work.path())
        .args([
            "deploy",
            "--no-input",
            "--python",
            "sh",
            "--url",
            &base,
            "--project",
            "crawlers",
            "--username",
            "admin",
            "--password",
            "secret",
            "--jobs",
            r#"[{"spider_name": "s1", "minute": "5"}]"#,
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(
            contains("1 of 3")
                .and(contains("possibly inconsistent"))
                .and(contains("aborting").not())
                .and(contains("WARN").not()),
        );

    assert_eq!(
        requests(&rx),
        [
            "GET /api/projects",
            "POST /project/3/spider/upload",
            "GET /api/projects/3/jobs",
            "PUT /api/projects/3/jobs/42",
            "GET /project/3/job/43/remove",
        ]
    );
    assert!(work.path().join("crawlers.egg").is_file());
}

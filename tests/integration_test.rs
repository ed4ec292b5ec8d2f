use std::fs::{self, File};
use std::path::Path;

use upload_to_filebin::utils::logging;
use upload_to_filebin::{start_session, App, Config, FileDiscovery, FileStateTracker, Ledger};

// ========== 文件系统级场景（不需要浏览器） ==========

#[test]
fn test_crash_recovery_resurfaces_all_files() {
    // 模拟：上一轮在处理第三个文件之前被强行中断，
    // 前两个文件已标记完成且已入账，第三个还没入账
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let zip_dir = dir.path().join("zip");
    fs::create_dir(&zip_dir).unwrap();
    File::create(zip_dir.join("a-DONE.zip")).unwrap();
    File::create(zip_dir.join("b-DONE.zip")).unwrap();
    File::create(zip_dir.join("c.zip")).unwrap();

    let ledger = Ledger::new(dir.path().join("output.csv"));
    ledger.upsert("a.zip", "https://filebin.net/bin-a").unwrap();
    ledger.upsert("b.zip", "https://filebin.net/bin-b").unwrap();

    // 重启后的恢复：回退所有完成标记
    let mut tracker = FileStateTracker::new(&zip_dir);
    let reverted = tracker.revert_all().expect("恢复失败");
    assert_eq!(reverted, 2);

    // 三个文件全部重新出现在待上传列表里
    let discovery = FileDiscovery::new(&zip_dir);
    let names: Vec<_> = discovery
        .discover()
        .unwrap()
        .into_iter()
        .map(|f| f.base_name)
        .collect();
    assert_eq!(names, vec!["a.zip", "b.zip", "c.zip"]);

    // 已有的台账记录原样保留，重跑时会被无害覆盖
    assert_eq!(ledger.records().unwrap().len(), 2);
}

#[test]
fn test_finalize_requires_ledger_record_first() {
    // 记账顺序不变量：先入账，后标记完成
    let dir = tempfile::tempdir().unwrap();
    let zip_dir = dir.path().join("zip");
    fs::create_dir(&zip_dir).unwrap();
    File::create(zip_dir.join("report.zip")).unwrap();

    let discovery = FileDiscovery::new(&zip_dir);
    let candidate = discovery.discover().unwrap().remove(0);

    let ledger = Ledger::new(dir.path().join("output.csv"));
    ledger
        .upsert(&candidate.base_name, "https://filebin.net/bin-r")
        .expect("入账失败");
    let records = ledger.records().unwrap();
    assert_eq!(records.len(), 1, "标记完成之前台账记录必须已存在");

    let mut tracker = FileStateTracker::new(&zip_dir);
    tracker.mark_done(&candidate).expect("标记完成失败");

    assert!(zip_dir.join("report-DONE.zip").exists());
    // 完成的文件不会再被发现
    assert!(discovery.discover().unwrap().is_empty());
}

#[test]
fn test_cleanup_always_reverts_even_after_success() {
    // 源系统语义（revert_policy = "always"）：整轮全部成功后
    // 清理阶段仍回退所有完成标记，下一轮会重新上传所有文件。
    // 该行为是否符合产品意图待确认，这里显式断言它
    let dir = tempfile::tempdir().unwrap();
    let zip_dir = dir.path().join("zip");
    fs::create_dir(&zip_dir).unwrap();
    File::create(zip_dir.join("report.zip")).unwrap();

    let discovery = FileDiscovery::new(&zip_dir);
    let candidate = discovery.discover().unwrap().remove(0);

    let ledger = Ledger::new(dir.path().join("output.csv"));
    ledger
        .upsert(&candidate.base_name, "https://filebin.net/bin-r")
        .unwrap();
    let mut tracker = FileStateTracker::new(&zip_dir);
    tracker.mark_done(&candidate).unwrap();
    assert!(zip_dir.join("report-DONE.zip").exists(), "完成瞬间确实打上了标记");

    // 清理阶段
    let reverted = tracker.revert_all().unwrap();

    assert_eq!(reverted, 1);
    assert!(zip_dir.join("report.zip").exists());
    assert!(!zip_dir.join("report-DONE.zip").exists());
    // 下一轮会重新发现它；台账记录保留，重传时无害覆盖
    assert_eq!(discovery.discover().unwrap().len(), 1);
    assert_eq!(ledger.records().unwrap().len(), 1);
}

#[test]
fn test_cleanup_on_failure_keeps_marks_after_success() {
    // 修正语义（revert_policy = "on-failure"）：运行成功时
    // 完成标记保持不动，下一轮不会重新上传
    let dir = tempfile::tempdir().unwrap();
    let zip_dir = dir.path().join("zip");
    fs::create_dir(&zip_dir).unwrap();
    File::create(zip_dir.join("report.zip")).unwrap();

    let discovery = FileDiscovery::new(&zip_dir);
    let candidate = discovery.discover().unwrap().remove(0);

    let ledger = Ledger::new(dir.path().join("output.csv"));
    ledger
        .upsert(&candidate.base_name, "https://filebin.net/bin-r")
        .unwrap();
    let mut tracker = FileStateTracker::new(&zip_dir);
    tracker.mark_done(&candidate).unwrap();

    // 成功的运行不触发回退；之后哪怕发生失败回退，
    // 也只涉及"那一轮"标记的文件
    assert!(zip_dir.join("report-DONE.zip").exists());
    assert!(discovery.discover().unwrap().is_empty());

    // 下一轮（新的 tracker）即使失败回退，也不动上一轮的完成标记
    let mut next_run_tracker = FileStateTracker::new(&zip_dir);
    assert_eq!(next_run_tracker.revert_marked().unwrap(), 0);
    assert!(zip_dir.join("report-DONE.zip").exists());
}

#[test]
fn test_rerun_upsert_overwrites_harmlessly() {
    // 同一个文件重传后，台账里仍只有一条记录，链接被替换
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::new(dir.path().join("output.csv"));

    ledger.upsert("report.zip", "https://filebin.net/first").unwrap();
    ledger.upsert("report.zip", "https://filebin.net/second").unwrap();

    let records = ledger.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].shared_link, "https://filebin.net/second");
}

// ========== 真实浏览器场景 ==========

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_upload_run_end_to_end() {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 准备一个待上传的压缩包
    fs::create_dir_all(&config.zip_dir).expect("创建目录失败");
    fs::write(
        Path::new(&config.zip_dir).join("report.zip"),
        b"integration test payload",
    )
    .expect("写入测试文件失败");

    // 初始化并执行一轮
    let app = App::initialize(config).await.expect("初始化失败");
    let stats = app.run().await.expect("运行失败");

    assert_eq!(stats.uploaded, 1, "应成功上传 1 个文件");
}

#[tokio::test]
#[ignore]
async fn test_browser_session() {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 测试浏览器会话
    let result = start_session(&config).await;

    assert!(result.is_ok(), "应该能够建立浏览器会话");
}

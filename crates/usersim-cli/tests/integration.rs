#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn usersim(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("usersim").unwrap();
    cmd.current_dir(dir.path())
        .env("USERSIM_ROSTER", dir.path().join("generated_users.jsonl"))
        .env_remove("NODE_URL")
        .env_remove("BASE_SEED")
        .env_remove("USERSIM_CONFIG")
        .env_remove("VALIDATOR_ADDRESS")
        .env_remove("RUST_LOG");
    cmd
}

fn dev(dir: &TempDir) -> Command {
    let mut cmd = usersim(dir);
    cmd.arg("--dev");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

fn roster_lines(dir: &TempDir) -> Vec<String> {
    std::fs::read_to_string(dir.path().join("generated_users.jsonl"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// usage
// ---------------------------------------------------------------------------

#[test]
fn help_lists_every_command() {
    let dir = TempDir::new().unwrap();
    usersim(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generateChildUsers"))
        .stdout(predicate::str::contains("depositTnt"))
        .stdout(predicate::str::contains("delegateTnt"))
        .stdout(predicate::str::contains("claimRewards"))
        .stdout(predicate::str::contains("transferAssets"));
}

#[test]
fn missing_subcommand_prints_usage() {
    let dir = TempDir::new().unwrap();
    usersim(&dir)
        .arg("--dev")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    assert!(roster_lines(&dir).is_empty());
}

#[test]
fn unknown_subcommand_is_rejected() {
    let dir = TempDir::new().unwrap();
    dev(&dir).arg("mintEverything").assert().failure();
}

#[test]
fn missing_required_flag_is_rejected() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args(["depositTnt", "--assetId", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--amount"));
}

// ---------------------------------------------------------------------------
// generateChildUsers
// ---------------------------------------------------------------------------

#[test]
fn generate_child_users_appends_to_roster() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args(["generateChildUsers", "--count", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Child User 0 - Address: 0x"))
        .stdout(predicate::str::contains("Seed: //User/Child/2"));
    assert_eq!(roster_lines(&dir).len(), 3);

    dev(&dir)
        .args(["generateChildUsers", "-c", "1"])
        .assert()
        .success();
    assert_eq!(roster_lines(&dir).len(), 4);
}

#[test]
fn generate_child_users_json() {
    let dir = TempDir::new().unwrap();
    let v = json_stdout(dev(&dir).args(["-j", "generateChildUsers", "--count", "2"]));
    assert_eq!(v["effect"], "child_users");
    let records = v["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["seed"], "//User/Child/1");
}

#[test]
fn base_seed_flag_changes_child_family() {
    let dir = TempDir::new().unwrap();
    let v = json_stdout(dev(&dir).args([
        "--json",
        "--base-seed",
        "//Base",
        "generateChildUsers",
        "--count",
        "1",
    ]));
    assert_eq!(v["records"][0]["seed"], "//Base/Child/0");
}

#[test]
fn zero_children_writes_nothing() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args(["generateChildUsers", "--count", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated 0 child user(s)"));
    assert!(roster_lines(&dir).is_empty());
}

// ---------------------------------------------------------------------------
// depositTnt / delegateTnt / claimRewards
// ---------------------------------------------------------------------------

#[test]
fn deposit_reports_ledger() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args(["depositTnt", "--assetId", "0", "--amount", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deposit submitted with hash: 0x"))
        .stdout(predicate::str::contains(
            "Delegation info: { bonded: 1000, delegations: [] }",
        ));
}

#[test]
fn delegate_bonds_then_delegates() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args([
            "delegateTnt",
            "--assetId",
            "0",
            "--amount",
            "500",
            "--validator",
            "0xabc",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bond submitted with hash"))
        .stdout(predicate::str::contains("delegations: [0xabc: 500]"));
}

#[test]
fn claim_rewards_reports_balance() {
    let dir = TempDir::new().unwrap();
    let v = json_stdout(dev(&dir).args(["claimRewards", "--json"]));
    assert_eq!(v["effect"], "rewards_claimed");
    // dev chain: 1000 token endowment plus a one-token reward
    assert_eq!(v["balance"], "1001000000000");
}

// ---------------------------------------------------------------------------
// transferAssets
// ---------------------------------------------------------------------------

#[test]
fn transfer_assets_reaches_every_child() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args(["generateChildUsers", "--count", "2"])
        .assert()
        .success();

    let v = json_stdout(dev(&dir).args([
        "-j",
        "transferAssets",
        "--assetId",
        "1",
        "--seedPhrase",
        "//Alice",
        "--amount",
        "5",
    ]));
    let transfers = v["transfers"].as_array().unwrap();
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[0]["balance"], 1_000_000_000_005u64);
}

#[test]
fn transfer_assets_help_explains_dedupe() {
    let dir = TempDir::new().unwrap();
    usersim(&dir)
        .args(["transferAssets", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Each distinct roster address receives one transfer"));
}

#[test]
fn transfer_assets_from_rostered_child_reaches_the_others() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args(["generateChildUsers", "--count", "3"])
        .assert()
        .success();

    let v = json_stdout(dev(&dir).args([
        "-j",
        "transferAssets",
        "--assetId",
        "1",
        "--seedPhrase",
        "//User/Child/0",
        "--amount",
        "5",
    ]));
    let transfers = v["transfers"].as_array().unwrap();
    assert_eq!(transfers.len(), 2);
    assert!(transfers.iter().all(|t| t["recipient"] != v["source"]));
}

#[test]
fn zero_amount_transfer_is_rejected() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args(["generateChildUsers", "--count", "1"])
        .assert()
        .success();
    dev(&dir)
        .args([
            "transferAssets",
            "--assetId",
            "1",
            "--seedPhrase",
            "//Alice",
            "--amount",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("amount must be greater than zero"));
}

#[test]
fn transfer_assets_with_empty_roster_does_nothing() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args([
            "transferAssets",
            "--assetId",
            "1",
            "--seedPhrase",
            "//Alice",
            "--amount",
            "5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed 0 transfer(s)"));
}

#[test]
fn corrupt_roster_fails_transfer() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("generated_users.jsonl"), "garbage\n").unwrap();
    dev(&dir)
        .args([
            "transferAssets",
            "--assetId",
            "1",
            "--seedPhrase",
            "//Alice",
            "--amount",
            "5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("roster line 1"));
}

// ---------------------------------------------------------------------------
// simulate / testActions
// ---------------------------------------------------------------------------

#[test]
fn simulate_runs_requested_transfers() {
    let dir = TempDir::new().unwrap();
    let v = json_stdout(dev(&dir).args(["-j", "simulate", "--users", "3", "--transactions", "4"]));
    let transfers = v["transfers"].as_array().unwrap();
    assert_eq!(transfers.len(), 4);
    for t in transfers {
        assert_ne!(t["from"], t["to"]);
        assert!(t.get("error").is_none());
    }
    assert_eq!(v["actors"].as_array().unwrap().len(), 3);
}

#[test]
fn simulate_prints_sender_and_recipient_of_each_transfer() {
    let dir = TempDir::new().unwrap();
    let out = dev(&dir)
        .args(["simulate", "--users", "2", "--transactions", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(out).unwrap();

    let line = stdout
        .lines()
        .find(|l| l.starts_with("Transaction 1: "))
        .unwrap();
    let (from, rest) = line["Transaction 1: ".len()..].split_once(" -> ").unwrap();
    let (to, rest) = rest.split_once(' ').unwrap();
    assert_ne!(from, to);
    assert!(rest.starts_with("(1000000000) 0x"));

    // dev chain endowment is 1000 tokens; one token moved from sender to recipient
    let row = |addr: &str| stdout.lines().find(|l| l.starts_with(addr)).unwrap();
    assert!(row(from).ends_with("999000000000"));
    assert!(row(to).ends_with("1001000000000"));
    assert!(stdout.contains("1 succeeded, 0 failed"));
}

#[test]
fn simulate_with_one_user_fails_fast() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .args(["simulate", "--users", "1", "--transactions", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("need at least 2 actors"));
}

#[test]
fn test_actions_runs_the_script() {
    let dir = TempDir::new().unwrap();
    dev(&dir)
        .arg("testActions")
        .assert()
        .success()
        .stdout(predicate::str::contains("== depositTnt"))
        .stdout(predicate::str::contains("== delegateTnt"))
        .stdout(predicate::str::contains("== claimRewards"))
        .stdout(predicate::str::contains("Final balance:"));
}

// ---------------------------------------------------------------------------
// session
// ---------------------------------------------------------------------------

#[test]
fn unreachable_node_fails_initialization() {
    let dir = TempDir::new().unwrap();
    usersim(&dir)
        .args(["--node-url", "ws://127.0.0.1:1", "claimRewards"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to initialize simulation"));
}

#[test]
fn config_file_is_honoured() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("usersim.yaml"),
        "base_seed: //FromConfig\n",
    )
    .unwrap();
    let v = json_stdout(dev(&dir).args(["-j", "generateChildUsers", "-c", "1"]));
    assert_eq!(v["records"][0]["seed"], "//FromConfig/Child/0");
}

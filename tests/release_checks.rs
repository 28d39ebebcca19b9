mod common;

use common::{FakeContext, FakeGit, ScriptedInput, TestRepo, quiet, v};
use monorel::release::{
    check_assert_tagging, check_branch_up_to_date, check_changelogs, check_dependencies_installed,
    check_has_remote, check_main_next_integrated, check_policy, check_release_notes,
};
use monorel::state::{Lane, Machine, Stage, State, release_table};
use monorel::version::VersionBump;
use monorel::workspace::ReleaseUnit;

const POLICY: &str = "npm run policy-check:fix";
const ASSERT_TAGGING: &str = "npm run policy-check:asserttagging";

fn client_repo(config: &str) -> TestRepo {
    let repo = TestRepo::client_group("2.0.0");
    repo.write(
        "monorel.toml",
        &format!(
            "{config}\n[release_groups.client]\ndirectory = \"packages\"\nchange_tracking = true\n"
        ),
    );
    repo
}

fn policy_repo() -> TestRepo {
    client_repo(&format!(
        "[commands]\npolicy = \"{POLICY}\"\nassert_tagging = \"{ASSERT_TAGGING}\"\n"
    ))
}

/// Context past the validation check: unit and release version settled
fn validated(repo: &TestRepo, git: FakeGit, bump: VersionBump) -> FakeContext {
    let mut ctx = repo.context("client", git);
    ctx.unit = Some(ReleaseUnit::Group("client".to_string()));
    ctx.release_version = Some(v("2.0.0"));
    ctx.set_bump_type(bump).unwrap();
    ctx
}

#[tokio::test]
async fn policy_check_passes_when_the_fix_leaves_no_diff() {
    let repo = policy_repo();
    let table = release_table();
    let state = State::preflight(Stage::CheckPolicy);
    let mut ctx = validated(&repo, FakeGit::on_branch("main"), VersionBump::Minor);

    let mut machine = Machine::new(&table, state);
    check_policy(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::preflight(Stage::CheckAssertTagging));
    assert_eq!(ctx.runner.ran(), vec![POLICY.to_string()]);
}

#[tokio::test]
async fn policy_check_fails_when_the_fix_changes_files() {
    let repo = policy_repo();
    let table = release_table();
    let state = State::preflight(Stage::CheckPolicy);
    let git = FakeGit::on_branch("main").with_statuses(&["", " M packages/a/package.json"]);
    let mut ctx = validated(&repo, git, VersionBump::Minor);

    let mut machine = Machine::new(&table, state);
    check_policy(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::failed());
    assert_eq!(ctx.runner.ran(), vec![POLICY.to_string()]);
}

#[tokio::test]
async fn policy_check_requires_a_clean_tree() {
    let repo = policy_repo();
    let table = release_table();
    let state = State::preflight(Stage::CheckPolicy);
    let git = FakeGit::on_branch("main").with_statuses(&["?? scratch.txt"]);
    let mut ctx = validated(&repo, git, VersionBump::Minor);

    let mut machine = Machine::new(&table, state);
    check_policy(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::failed());
    assert!(ctx.runner.ran().is_empty());
}

async fn disabled_policy_run(branch: &str, stage: Stage) -> (State, Vec<String>) {
    let repo = policy_repo();
    let table = release_table();
    let state = State::preflight(stage);
    let mut ctx = validated(&repo, FakeGit::on_branch(branch), VersionBump::Minor);
    ctx.flags.should_check_policy = false;

    let mut machine = Machine::new(&table, state);
    let log = quiet();
    let handled = match stage {
        Stage::CheckPolicy => check_policy(state, &mut machine, false, &log, &mut ctx).await,
        _ => check_assert_tagging(state, &mut machine, false, &log, &mut ctx).await,
    };
    assert!(handled.unwrap());
    (machine.state(), ctx.runner.ran())
}

#[tokio::test]
async fn disabled_policy_check_still_runs_on_protected_branches() {
    let (state, ran) = disabled_policy_run("main", Stage::CheckPolicy).await;
    assert_eq!(state, State::preflight(Stage::CheckAssertTagging));
    assert_eq!(ran, vec![POLICY.to_string()]);

    let (state, ran) = disabled_policy_run("feature/x", Stage::CheckPolicy).await;
    assert_eq!(state, State::preflight(Stage::CheckAssertTagging));
    assert!(ran.is_empty());
}

#[tokio::test]
async fn assert_tagging_follows_the_policy_gate() {
    let (state, ran) = disabled_policy_run("main", Stage::CheckAssertTagging).await;
    assert_eq!(state, State::preflight(Stage::CheckHasRemote));
    assert_eq!(ran, vec![ASSERT_TAGGING.to_string()]);

    let (state, ran) = disabled_policy_run("feature/x", Stage::CheckAssertTagging).await;
    assert_eq!(state, State::preflight(Stage::CheckHasRemote));
    assert!(ran.is_empty());
}

#[tokio::test]
async fn assert_tagging_fails_when_it_changes_files() {
    let repo = policy_repo();
    let table = release_table();
    let state = State::preflight(Stage::CheckAssertTagging);
    let git = FakeGit::on_branch("main").with_statuses(&["", " M packages/b/package.json"]);
    let mut ctx = validated(&repo, git, VersionBump::Minor);

    let mut machine = Machine::new(&table, state);
    check_assert_tagging(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::failed());
    assert_eq!(ctx.runner.ran(), vec![ASSERT_TAGGING.to_string()]);
}

#[tokio::test]
async fn remote_must_point_at_upstream() {
    let repo = client_repo("upstream = \"example/monorepo\"\n");
    let table = release_table();
    let state = State::preflight(Stage::CheckHasRemote);

    let git = FakeGit::on_branch("main")
        .with_remote("origin", "git@github.com:someone/monorepo.git")
        .with_remote("upstream", "https://github.com/example/monorepo.git");
    let mut ctx = validated(&repo, git, VersionBump::Minor);
    let mut machine = Machine::new(&table, state);
    check_has_remote(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::preflight(Stage::CheckBranchUpToDate));
    assert_eq!(ctx.remote.as_deref(), Some("upstream"));

    let git =
        FakeGit::on_branch("main").with_remote("origin", "git@github.com:someone/monorepo.git");
    let mut ctx = validated(&repo, git, VersionBump::Minor);
    let mut machine = Machine::new(&table, state);
    check_has_remote(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::failed());
    assert_eq!(ctx.remote, None);
}

#[tokio::test]
async fn stale_branch_fails_unless_the_check_is_disabled() {
    let repo = TestRepo::client_group("2.0.0");
    let table = release_table();
    let state = State::preflight(Stage::CheckBranchUpToDate);

    for (enabled, expected) in [
        (true, State::failed()),
        (false, State::preflight(Stage::CheckDependenciesInstalled)),
    ] {
        let mut git = FakeGit::on_branch("main");
        git.up_to_date = false;
        let mut ctx = validated(&repo, git, VersionBump::Minor);
        ctx.remote = Some("upstream".to_string());
        ctx.flags.should_check_branch_update = enabled;

        let mut machine = Machine::new(&table, state);
        check_branch_up_to_date(state, &mut machine, false, &quiet(), &mut ctx)
            .await
            .unwrap();
        assert_eq!(machine.state(), expected, "check enabled: {enabled}");
    }
}

#[tokio::test]
async fn uninstalled_dependencies_fail() {
    let repo = TestRepo::client_group("2.0.0");
    std::fs::remove_dir_all(repo.path().join("node_modules/@fluid/b")).unwrap();
    let table = release_table();
    let state = State::preflight(Stage::CheckDependenciesInstalled);
    let mut ctx = validated(&repo, FakeGit::on_branch("main"), VersionBump::Minor);

    let mut machine = Machine::new(&table, state);
    check_dependencies_installed(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::failed());
}

#[tokio::test]
async fn major_release_needs_main_and_next_integrated() {
    let repo = TestRepo::client_group("2.0.0");
    let table = release_table();
    let state = State::new(Stage::CheckMainNextIntegrated, Lane::Major);
    let integrated = State::new(Stage::CheckReleaseNotes, Lane::Major);
    let diverged = State::new(Stage::PromptToRunMinorReleaseCommand, Lane::Major);

    for (bump, next_sha, expected) in [
        (VersionBump::Major, "abc123", integrated),
        (VersionBump::Major, "def456", diverged),
        // Only major releases are gated
        (VersionBump::Minor, "def456", integrated),
    ] {
        let git = FakeGit::on_branch("main")
            .with_sha("upstream/main", "abc123")
            .with_sha("upstream/next", next_sha);
        let mut ctx = validated(&repo, git, bump);
        ctx.remote = Some("upstream".to_string());

        let mut machine = Machine::new(&table, state);
        check_main_next_integrated(state, &mut machine, false, &quiet(), &mut ctx)
            .await
            .unwrap();
        assert_eq!(machine.state(), expected, "{bump} with next at {next_sha}");
    }
}

#[tokio::test]
async fn tracked_groups_need_release_notes() {
    let repo = client_repo("");
    let table = release_table();

    let state = State::new(Stage::CheckReleaseNotes, Lane::Minor);
    let mut ctx = validated(&repo, FakeGit::on_branch("main"), VersionBump::Minor);
    let mut machine = Machine::new(&table, state);
    check_release_notes(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(
        machine.state(),
        State::new(Stage::PromptToWriteReleaseNotes, Lane::Minor)
    );

    repo.write("RELEASE_NOTES/client_v2.0.0.md", "# client 2.0.0\n");
    let mut machine = Machine::new(&table, state);
    check_release_notes(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::new(Stage::CheckChangelogs, Lane::Minor));
}

#[tokio::test]
async fn patch_releases_skip_release_notes() {
    let repo = client_repo("");
    let table = release_table();
    let state = State::new(Stage::CheckReleaseNotes, Lane::Patch);
    let mut ctx = validated(&repo, FakeGit::on_branch("release/client_v2.0"), VersionBump::Patch);

    let mut machine = Machine::new(&table, state);
    check_release_notes(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    assert_eq!(machine.state(), State::new(Stage::CheckChangelogs, Lane::Patch));
}

async fn changelog_check(input: ScriptedInput, interactive: bool) -> (State, Vec<String>) {
    // Changelogs document 2.0.0; the release is 2.1.0
    let repo = TestRepo::client_group("2.0.0");
    let table = release_table();
    let state = State::new(Stage::CheckChangelogs, Lane::Minor);
    let mut ctx = validated(&repo, FakeGit::on_branch("main"), VersionBump::Minor);
    ctx.release_version = Some(v("2.1.0"));
    ctx.input = input;
    ctx.flags.interactive = interactive;

    let mut machine = Machine::new(&table, state);
    check_changelogs(state, &mut machine, false, &quiet(), &mut ctx)
        .await
        .unwrap();
    (machine.state(), ctx.input.questions())
}

#[tokio::test]
async fn missing_changelogs_ask_the_operator() {
    let (state, questions) = changelog_check(ScriptedInput::answering(&[true]), true).await;
    assert_eq!(state, State::new(Stage::CheckReleaseIsDone, Lane::Minor));
    assert_eq!(questions.len(), 1);

    let (state, _) = changelog_check(ScriptedInput::answering(&[false]), true).await;
    assert_eq!(state, State::new(Stage::PromptToGenerateChangelogs, Lane::Minor));

    let (state, questions) = changelog_check(ScriptedInput::answering(&[true]), false).await;
    assert_eq!(state, State::new(Stage::PromptToGenerateChangelogs, Lane::Minor));
    assert!(questions.is_empty());
}

//! End-to-end parsing: log text and API objects to histories

use chrono::Duration;
use pivote_engine::{
    collect, parse_blob, parse_units, Choice, ParseMode, PipelineError, ProposalToken,
    ScopeFilter, SourceUnit, Stage,
};

use pivote_engine::parsing::{decode_votes, repair};

use crate::common::*;

fn scoped(token: &str) -> ScopeFilter {
    ScopeFilter::for_token(ProposalToken::parse(token).unwrap())
}

fn parse_ok(blob: &str, scope: &ScopeFilter) -> Vec<pivote_engine::History> {
    collect(parse_blob(blob, scope), ParseMode::Strict)
        .unwrap()
        .histories
}

#[test]
fn test_scenario_single_vote() {
    let ticket = ticket(1);
    let blob = format!(
        "commit 62f715e00c50e7c506acc4b6e33eb86d02bab6d1\nAuthor: Politeia <noreply@decred.org>\nDate: Mon Nov 5 17:58:13 2018 +0000\n\n    Flush vote journals.\n\ndiff --git a/{t}/3/plugins/decred/ballot.journal b/{t}/3/plugins/decred/ballot.journal\n+{line}\n",
        t = T1,
        line = add(T1, &ticket, "1")
    );

    let histories = parse_ok(&blob, &ScopeFilter::any());
    assert_eq!(histories.len(), 1);

    let history = &histories[0];
    assert_eq!(history.author, POLITEIA);
    assert_eq!(history.commit_sha, "62f715e00c50e7c506acc4b6e33eb86d02bab6d1");
    assert_eq!(history.date.to_rfc3339(), "2018-11-05T17:58:13+00:00");
    assert_eq!(history.patch.len(), 1);
    assert_eq!(history.patch[0].token.as_str(), T1);
    assert_eq!(history.patch[0].votes.len(), 1);
    assert_eq!(history.patch[0].votes[0].ticket, ticket);
    assert_eq!(history.patch[0].votes[0].choice, Choice::No);
}

#[test]
fn test_round_trip_preserves_line_order() {
    let lines: Vec<String> = (0..25).map(|n| add(T1, &ticket(n), "2")).collect();
    let commit = CommitFixture::new(
        "62f715e00c50e7c506acc4b6e33eb86d02bab6d1",
        "2018-11-05T17:58:13Z",
    )
    .file(T1, lines);

    let histories = parse_ok(&commit.log_text(), &ScopeFilter::any());
    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].date, commit.date());

    let tickets: Vec<String> = histories[0].patch[0]
        .votes
        .iter()
        .map(|v| v.ticket.clone())
        .collect();
    let expected: Vec<String> = (0..25).map(ticket).collect();
    assert_eq!(tickets, expected);
}

#[test]
fn test_action_filtering() {
    let commit = CommitFixture::new("aa11", "2019-02-28T21:35:56Z").file(
        T1,
        vec![
            add(T1, &ticket(1), "2"),
            journal_line("del", T1, &ticket(2), "1"),
            journal_line("addlike", T1, &ticket(3), "1"),
        ],
    );

    let histories = parse_ok(&commit.log_text(), &ScopeFilter::any());
    let votes = &histories[0].patch[0].votes;
    let tickets: Vec<&str> = votes.iter().map(|v| v.ticket.as_str()).collect();
    assert_eq!(tickets, vec![ticket(1).as_str(), ticket(3).as_str()]);
    assert_eq!(votes[1].choice, Choice::No);
}

#[test]
fn test_del_does_not_retract_earlier_add() {
    let first = CommitFixture::new("aa11", "2019-02-28T21:35:56Z")
        .file(T1, vec![add(T1, &ticket(1), "2")]);
    let second = CommitFixture::new("bb22", "2019-02-28T22:35:56Z")
        .file(T1, vec![journal_line("del", T1, &ticket(1), "2"), add(T1, &ticket(2), "1")]);

    let histories = parse_ok(&log_of(&[first, second]), &ScopeFilter::any());
    assert_eq!(histories.len(), 2);
    assert_eq!(histories[0].patch[0].votes[0].ticket, ticket(1));
    assert_eq!(histories[1].patch[0].votes.len(), 1);
}

#[test]
fn test_commit_with_only_deletions_is_dropped() {
    let commit = CommitFixture::new("aa11", "2019-02-28T21:35:56Z")
        .file(T1, vec![journal_line("del", T1, &ticket(1), "2")]);
    assert!(parse_ok(&commit.log_text(), &ScopeFilter::any()).is_empty());
}

#[test]
fn test_vote_bit_totality() {
    let bits = ["1", "2", "3", "", "x", "0", "22", "-1"];
    let lines: Vec<String> = bits
        .iter()
        .enumerate()
        .map(|(n, bit)| add(T1, &ticket(n as u32), bit))
        .collect();
    let commit = CommitFixture::new("cc33", "2019-03-01T01:27:13Z").file(T1, lines);

    let histories = parse_ok(&commit.log_text(), &ScopeFilter::any());
    let choices: Vec<Choice> = histories[0].patch[0].votes.iter().map(|v| v.choice).collect();
    assert_eq!(
        choices,
        vec![
            Choice::No,
            Choice::Yes,
            Choice::Unknown,
            Choice::Unknown,
            Choice::Unknown,
            Choice::Unknown,
            Choice::Unknown,
            Choice::Unknown,
        ]
    );
}

#[test]
fn test_odd_ticket_values_do_not_fail_commit() {
    let lines = vec![
        add(T1, &ticket(1), "2"),
        format!(
            "{{\"version\":\"1\",\"action\":\"add\"}}{{\"castvote\":{{\"token\":\"{}\",\"votebit\":\"2\"}}}}",
            T1
        ),
        add(T1, &ticket(3), "1").replace(&format!("\"{}\"", ticket(3)), "12"),
    ];
    let commit = CommitFixture::new("ee55", "2019-03-01T01:27:13Z").file(T1, lines);

    let histories = parse_ok(&commit.log_text(), &ScopeFilter::any());
    let tickets: Vec<&str> = histories[0].patch[0]
        .votes
        .iter()
        .map(|v| v.ticket.as_str())
        .collect();
    assert_eq!(tickets, vec![ticket(1).as_str(), "", "12"]);
}

#[test]
fn test_scoping() {
    let only_t2 = CommitFixture::new("dd44", "2019-03-01T01:27:13Z")
        .file(T2, vec![add(T2, &ticket(1), "2")]);
    assert!(parse_ok(&only_t2.log_text(), &scoped(T1)).is_empty());

    let both = CommitFixture::new("ee55", "2019-03-01T02:27:13Z")
        .file(T1, vec![add(T1, &ticket(2), "2")])
        .file(T2, vec![add(T2, &ticket(3), "1")]);

    let histories = parse_ok(&both.log_text(), &ScopeFilter::any());
    assert_eq!(histories.len(), 1);
    let tokens: Vec<&str> = histories[0].patch.iter().map(|f| f.token.as_str()).collect();
    assert_eq!(tokens, vec![T1, T2]);

    let histories = parse_ok(&both.log_text(), &scoped(T2));
    assert_eq!(histories[0].patch.len(), 1);
    assert_eq!(histories[0].patch[0].token.as_str(), T2);
}

#[test]
fn test_repair_idempotence() {
    let payload = |line: String| line[line.find("}{").unwrap() + 1..].to_string();
    let a = payload(add(T1, &ticket(1), "2"));
    let b = payload(add(T1, &ticket(2), "1"));

    let concatenated = repair(&format!("{}{}", a, b)).unwrap();
    let bracketed = repair(&format!("[{},{}]", a, b)).unwrap();
    assert_eq!(concatenated, bracketed);
    assert_eq!(repair(&concatenated).unwrap(), concatenated);

    assert_eq!(
        decode_votes(&concatenated).unwrap(),
        decode_votes(&format!("[{},{}]", a, b)).unwrap()
    );
}

#[test]
fn test_since_cutoff_edge() {
    let commit = CommitFixture::new("ab12", "2019-03-01T01:27:13Z")
        .file(T1, vec![add(T1, &ticket(1), "2")]);
    let date = commit.date();
    let blob = commit.log_text();

    assert!(parse_ok(&blob, &ScopeFilter::any().since(date)).is_empty());
    assert_eq!(parse_ok(&blob, &ScopeFilter::any().since(date - Duration::seconds(1))).len(), 1);
    assert_eq!(parse_ok(&blob, &ScopeFilter::any().since(date + Duration::seconds(1))).len(), 1);
}

#[test]
fn test_commits_keep_source_order() {
    let commits: Vec<CommitFixture> = ["2019-03-01T03:00:00Z", "2019-03-01T01:00:00Z", "2019-03-01T02:00:00Z"]
        .iter()
        .enumerate()
        .map(|(n, date)| {
            CommitFixture::new(&format!("{:040x}", n + 1), date)
                .file(T1, vec![add(T1, &ticket(n as u32), "2")])
        })
        .collect();

    let histories = parse_ok(&log_of(&commits), &ScopeFilter::any());
    let shas: Vec<&str> = histories.iter().map(|h| h.commit_sha.as_str()).collect();
    let expected: Vec<&str> = commits.iter().map(|c| c.sha.as_str()).collect();
    assert_eq!(shas, expected);
}

#[test]
fn test_non_vote_commits_are_ignored() {
    let blob = format!(
        "commit 0123abcd\nAuthor: Someone <a@b.c>\nDate:   Mon Nov 5 17:58:13 2018 +0000\n\n    Update README\n\ndiff --git a/README.md b/README.md\n+hello\n{}",
        CommitFixture::new("4567ef01", "2019-03-01T01:27:13Z")
            .file(T1, vec![add(T1, &ticket(1), "2")])
            .log_text()
    );
    let histories = parse_ok(&blob, &ScopeFilter::any());
    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].commit_sha, "4567ef01");
}

#[test]
fn test_crlf_log() {
    let commit = CommitFixture::new("77aa", "2019-03-01T01:27:13Z")
        .file(T1, vec![add(T1, &ticket(1), "2"), add(T1, &ticket(2), "1")]);
    let blob = commit.log_text().replace('\n', "\r\n");

    let histories = parse_ok(&blob, &ScopeFilter::any());
    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].author, POLITEIA);
    assert_eq!(histories[0].patch[0].votes.len(), 2);
}

#[test]
fn test_lenient_and_strict_modes() {
    let good = CommitFixture::new("1111", "2019-03-01T01:27:13Z")
        .file(T1, vec![add(T1, &ticket(1), "2")]);
    let bad = CommitFixture::new("2222", "2019-03-01T02:27:13Z")
        .file(T1, vec![add(T1, &ticket(2), "2")])
        .without_date();
    let later = CommitFixture::new("3333", "2019-03-01T03:27:13Z")
        .file(T1, vec![add(T1, &ticket(3), "1")]);
    let blob = log_of(&[good, bad, later]);

    let report = collect(parse_blob(&blob, &ScopeFilter::any()), ParseMode::Lenient).unwrap();
    let shas: Vec<&str> = report.histories.iter().map(|h| h.commit_sha.as_str()).collect();
    assert_eq!(shas, vec!["1111", "3333"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage(), Stage::Metadata);
    assert_eq!(report.failures[0].commit(), Some("2222"));

    let err = collect(parse_blob(&blob, &ScopeFilter::any()), ParseMode::Strict).unwrap_err();
    assert!(matches!(err, PipelineError::MalformedCommit { field: "Date", .. }));
}

#[test]
fn test_api_objects_match_log_text() {
    let commits = vec![
        CommitFixture::new("62f715e00c50e7c506acc4b6e33eb86d02bab6d1", "2018-11-05T17:58:13Z")
            .file(T1, vec![add(T1, &ticket(1), "1"), journal_line("del", T1, &ticket(9), "1")]),
        CommitFixture::new("eced3135d573509e4460af56d148f177498be122", "2018-11-05T18:58:13Z")
            .file(T1, vec![add(T1, &ticket(2), "2")])
            .file(T2, vec![add(T2, &ticket(3), "2")]),
    ];

    let from_text = parse_ok(&log_of(&commits), &ScopeFilter::any());

    let units: Vec<SourceUnit> = commits.iter().map(|c| SourceUnit::Commit(c.api_object())).collect();
    let from_api = collect(parse_units(&units, &ScopeFilter::any()), ParseMode::Strict)
        .unwrap()
        .histories;

    assert_eq!(from_text, from_api);
}

#[test]
fn test_quoted_api_patch() {
    let commit = CommitFixture::new("eced3135", "2018-11-05T18:58:13Z")
        .file(T1, vec![add(T1, &ticket(2), "2")]);
    let mut object = commit.api_object();
    object.files[0].patch = serde_json::to_string(&object.files[0].patch).unwrap();

    let results = parse_units(&[SourceUnit::Commit(object)], &ScopeFilter::any());
    let histories = collect(results, ParseMode::Strict).unwrap().histories;
    assert_eq!(histories[0].patch[0].votes[0].ticket, ticket(2));
}

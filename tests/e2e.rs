use anyhow::{Context, Result, ensure};
use assert_cmd::Command;

fn run_demo(args: &[&str]) -> Result<Vec<String>> {
    let output = Command::cargo_bin("sketch_mesh")
        .context("demo binary should build")?
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .context("failed to run demo binary")?;

    ensure!(
        output.status.success(),
        "demo exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(String::from_utf8(output.stdout)?
        .lines()
        .map(str::to_string)
        .collect())
}

#[test]
fn demo_plays_a_full_scripted_round() -> Result<()> {
    let lines = run_demo(&[])?;

    let banner = lines.first().context("demo printed nothing")?;
    ensure!(
        banner.starts_with("*** room ") && banner.ends_with(" hosted by ada"),
        "unexpected banner: {banner}"
    );

    let tail: Vec<&str> = lines[1..].iter().map(String::as_str).collect();
    assert_eq!(
        tail,
        vec![
            "*** lobby: ada",
            "*** lobby: ada, grace",
            "*** lobby: ada, grace, alan",
            "*** game started with 3 players",
            "*** grace received a DRAWING_UPDATE",
            "*** alan received a DRAWING_UPDATE",
            "*** grace saw the stroke end",
            "*** alan saw the stroke end",
            "*** demo complete",
        ]
    );

    Ok(())
}

#[test]
fn demo_honors_custom_player_names() -> Result<()> {
    let lines = run_demo(&["--host", "bea", "--guests", "carl"])?;

    ensure!(
        lines
            .first()
            .is_some_and(|line| line.ends_with(" hosted by bea")),
        "unexpected banner: {lines:?}"
    );
    let tail: Vec<&str> = lines[1..].iter().map(String::as_str).collect();
    assert_eq!(
        tail,
        vec![
            "*** lobby: bea",
            "*** lobby: bea, carl",
            "*** game started with 2 players",
            "*** carl received a DRAWING_UPDATE",
            "*** carl saw the stroke end",
            "*** demo complete",
        ]
    );

    Ok(())
}

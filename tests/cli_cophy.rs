use assert_cmd::Command;
use tempfile::TempDir;

// ================================================================================================
// cophy recon
// ================================================================================================

#[test]
fn command_recon_simple() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd.arg("recon").arg("tests/cophy/simple.txt").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    assert!(stdout.contains("cost\t3\n"));
    assert!(stdout.contains("mprs\t2\n"));
    assert!(stdout.contains("roots\tq0-m1\n"));
    assert!(stdout.contains("nodes\t7\n"));
    assert!(stdout.contains("events\t8\n"));

    Ok(())
}

#[test]
fn command_recon_deep_host() -> anyhow::Result<()> {
    let mut host = "(h0,h1)i1".to_string();
    for i in 2..=3000 {
        host = format!("({},h{})i{}", host, i, i);
    }
    let input = format!("{};\n(p1,p2)q;\np1:h0\np2:h1\n", host);

    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd.arg("recon").arg("stdin").write_stdin(input).output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    assert!(stdout.contains("cost\t0\n"));
    assert!(stdout.contains("mprs\t1\n"));
    assert!(stdout.contains("roots\tq-i1\n"));

    Ok(())
}

#[test]
fn command_recon_congruent() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd.arg("recon").arg("tests/cophy/congruent.txt").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("cost\t0\n"));
    assert!(stdout.contains("mprs\t1\n"));
    assert!(stdout.contains("roots\tq0-m0\n"));

    Ok(())
}

#[test]
fn command_recon_costs() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("recon")
        .arg("tests/cophy/transfer.txt")
        .arg("-D")
        .arg("2")
        .arg("-T")
        .arg("1")
        .arg("-L")
        .arg("1")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("cost\t1\n"));
    assert!(stdout.contains("mprs\t2\n"));
    assert!(stdout.contains("roots\tq-h1,q-h2\n"));

    Ok(())
}

#[test]
fn command_recon_stdin() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("recon")
        .arg("stdin")
        .write_stdin(std::fs::read_to_string("tests/cophy/simple.txt")?)
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("cost\t3\n"));

    Ok(())
}

#[test]
fn command_recon_bad_input() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    cmd.arg("recon")
        .arg("tests/cophy/bad_host.txt")
        .assert()
        .failure();

    let mut cmd = Command::cargo_bin("cophy")?;
    cmd.arg("recon")
        .arg("tests/cophy/simple.txt")
        .arg("-L")
        .arg("-1")
        .assert()
        .failure();

    Ok(())
}

// ================================================================================================
// cophy sample / enumerate
// ================================================================================================

#[test]
fn command_sample() -> anyhow::Result<()> {
    let run = |seed: &str| -> anyhow::Result<String> {
        let mut cmd = Command::cargo_bin("cophy")?;
        let output = cmd
            .arg("sample")
            .arg("tests/cophy/tangled.txt")
            .arg("-n")
            .arg("5")
            .arg("--seed")
            .arg(seed)
            .output()?;
        Ok(String::from_utf8(output.stdout)?)
    };

    let a = run("7")?;
    assert_eq!(a.lines().filter(|l| l.starts_with("#MPR")).count(), 5);
    assert_eq!(a, run("7")?);

    Ok(())
}

#[test]
fn command_enumerate() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd.arg("enumerate").arg("tests/cophy/simple.txt").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().filter(|l| l.starts_with("#MPR")).count(), 2);
    assert!(stdout.contains("cost=3"));
    assert!(stdout.contains("q0-m1\tD q1-m1 p3-m1\n"));
    assert!(stdout.contains("q1-h2\tT "));

    let mut cmd = Command::cargo_bin("cophy")?;
    cmd.arg("enumerate")
        .arg("tests/cophy/simple.txt")
        .arg("--max-mprs")
        .arg("1")
        .assert()
        .failure();

    Ok(())
}

// ================================================================================================
// cophy pdv / median / support
// ================================================================================================

#[test]
fn command_pdv() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd.arg("pdv").arg("tests/cophy/simple.txt").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout, "distance\tcount\n0\t2\n5\t2\n");

    // the loss towards h1 no longer counts
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("pdv")
        .arg("tests/cophy/simple.txt")
        .arg("--zero-loss")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout, "distance\tcount\n0\t2\n4\t2\n");

    Ok(())
}

#[test]
fn command_pdv_stats() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("pdv")
        .arg("tests/cophy/simple.txt")
        .arg("--stats")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("pairs\t4\n"));
    assert!(stdout.contains("diameter\t5\n"));
    assert!(stdout.contains("mean\t2.5000\n"));

    Ok(())
}

#[test]
fn command_pdv_normalize() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("pdv")
        .arg("tests/cophy/simple.txt")
        .arg("--normalize")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // two internal parasite nodes
    assert_eq!(stdout, "distance\tcount\n0.0000\t0.500000\n1.2500\t0.500000\n");

    Ok(())
}

#[test]
fn command_median() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd.arg("median").arg("tests/cophy/simple.txt").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // both MPRs are equally central
    assert!(stdout.contains("#median\tcount=2\tscore=6\n"));
    assert_eq!(stdout.lines().filter(|l| l.starts_with("#MPR")).count(), 1);

    Ok(())
}

#[test]
fn command_support() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd.arg("support").arg("tests/cophy/simple.txt").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 9);
    assert!(stdout.starts_with("node\tevent\tcount\tsupport\n"));
    assert!(stdout.contains("p1-h1\tC p1-h1 \t2\t1.0000\n"));
    assert!(stdout.contains("q0-m1\tD q1-m1 p3-m1\t1\t0.5000\n"));

    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("support")
        .arg("tests/cophy/simple.txt")
        .arg("--max")
        .arg("0.99")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 6);

    Ok(())
}

// ================================================================================================
// cophy cluster
// ================================================================================================

#[test]
fn command_cluster() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("cluster")
        .arg("tests/cophy/simple.txt")
        .arg("-k")
        .arg("2")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // one MPR per cluster, no spread left
    assert!(stdout.contains("1\t1\t1\t0.5000\t0.0000\n"));
    assert!(stdout.contains("2\t1\t1\t0.5000\t0.0000\n"));
    assert!(stdout.contains("#objective\t0.0000\n"));

    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("cluster")
        .arg("tests/cophy/simple.txt")
        .arg("-k")
        .arg("1")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("1\t2\t2\t1.0000\t2.5000\n"));
    assert!(stdout.contains("#objective\t2.5000\n"));

    Ok(())
}

#[test]
fn command_cluster_options() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("cluster")
        .arg("tests/cophy/tangled.txt")
        .arg("-D")
        .arg("1")
        .arg("-T")
        .arg("1")
        .arg("-L")
        .arg("1")
        .arg("-k")
        .arg("2")
        .arg("--mode")
        .arg("nmprs=4")
        .arg("--scorer")
        .arg("support")
        .arg("--parallel")
        .arg("2")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    assert_eq!(stdout.lines().filter(|l| !l.starts_with('#')).count(), 3);

    let mut cmd = Command::cargo_bin("cophy")?;
    cmd.arg("cluster")
        .arg("tests/cophy/simple.txt")
        .arg("--mode")
        .arg("width=2")
        .assert()
        .failure();

    Ok(())
}

// ================================================================================================
// cophy pvalue
// ================================================================================================

#[test]
fn command_pvalue() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("pvalue")
        .arg("tests/cophy/congruent.txt")
        .arg("--trials")
        .arg("20")
        .arg("--costs")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("observed\t0\n"));
    assert!(stdout.contains("trials\t20\n"));
    assert!(stdout.contains("failures\t0\n"));
    assert!(stdout.contains("p-value\t"));
    assert_eq!(stdout.lines().filter(|l| l.starts_with('#')).count(), 20);

    let mut cmd = Command::cargo_bin("cophy")?;
    cmd.arg("pvalue")
        .arg("tests/cophy/congruent.txt")
        .arg("--trials")
        .arg("0")
        .assert()
        .failure();

    Ok(())
}

// ================================================================================================
// cophy sif
// ================================================================================================

#[test]
fn command_sif_round_trip() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let graph = tempdir.path().join("graph.sif");
    let graph = graph.to_str().unwrap();

    let mut cmd = Command::cargo_bin("cophy")?;
    cmd.arg("recon")
        .arg("tests/cophy/simple.txt")
        .arg("--sif")
        .arg(graph)
        .assert()
        .success();

    let text = std::fs::read_to_string(graph)?;
    assert!(text.contains("q0-m1\tme\tD q1-m1 p3-m1\n"));

    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("sif")
        .arg("tests/cophy/simple.txt")
        .arg("--graph")
        .arg(graph)
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("roots\tq0-m1\n"));
    assert!(stdout.contains("mprs\t2\n"));
    assert!(stdout.contains("C\t3\n"));
    assert!(stdout.contains("L\t1\n"));

    Ok(())
}

#[test]
fn command_sif_median() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let graph = tempdir.path().join("median.sif");
    let graph = graph.to_str().unwrap();

    let mut cmd = Command::cargo_bin("cophy")?;
    cmd.arg("median")
        .arg("tests/cophy/simple.txt")
        .arg("--sif")
        .arg(graph)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("cophy")?;
    let output = cmd
        .arg("sif")
        .arg("tests/cophy/simple.txt")
        .arg("-g")
        .arg(graph)
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("mprs\t2\n"));

    Ok(())
}

use crate::e2e::*;

fn touch_buildfile() -> String {
    [
        TOUCH_RULE,
        "file in = in.txt",
        "build out = out.txt : touch in",
        "default out",
        "",
    ]
    .join("\n")
}

#[test]
fn basic_build() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &touch_buildfile())?;
    space.write("in.txt", "")?;
    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert!(space.read("out.txt").is_ok());
    assert_output_contains(&out, "touch out.txt");
    assert_output_contains(&out, "sbuild: ran 1 tasks, now up to date");
    Ok(())
}

#[test]
fn second_build_does_nothing() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &touch_buildfile())?;
    space.write("in.txt", "")?;
    space.run_expect(&mut sbuild_command(vec!["out"]))?;
    space.set_mtime("in.txt", 1)?;
    space.set_mtime("out.txt", 2)?;

    let out = space.run_expect(&mut sbuild_command(vec!["out"]))?;
    assert_eq!(std::str::from_utf8(&out.stdout)?, "sbuild: no work to do\n");
    Ok(())
}

#[test]
fn newer_input_rebuilds() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &touch_buildfile())?;
    space.write("in.txt", "")?;
    space.write("out.txt", "")?;
    space.set_mtime("in.txt", 10)?;
    space.set_mtime("out.txt", 5)?;

    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert_output_contains(&out, "ran 1 tasks");
    Ok(())
}

#[test]
fn equal_timestamps_are_up_to_date() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &touch_buildfile())?;
    space.write("in.txt", "")?;
    space.write("out.txt", "")?;
    space.set_mtime("in.txt", 7)?;
    space.set_mtime("out.txt", 7)?;

    let out = space.run_expect(&mut sbuild_command(vec![]))?;
    assert_output_contains(&out, "no work to do");
    Ok(())
}

#[test]
fn create_subdir() -> anyhow::Result<()> {
    // Run a build rule that needs a subdir to be automatically created.
    let space = TestSpace::new()?;
    space.write(
        "buildfile",
        &[TOUCH_RULE, "build out = gen/sub/out : touch", ""].join("\n"),
    )?;
    space.run_expect(&mut sbuild_command(vec!["out"]))?;
    assert!(space.read("gen/sub/out").is_ok());
    Ok(())
}

#[test]
fn chain_runs_in_order() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "buildfile",
        &[
            COPY_RULE,
            "file src = a.txt",
            "build mid = b.txt : copy src",
            "build last = c.txt : copy mid",
            "",
        ]
        .join("\n"),
    )?;
    space.write("a.txt", "payload")?;
    let out = space.run_expect(&mut sbuild_command(vec!["last"]))?;
    assert_eq!(space.read("c.txt")?, b"payload");
    let stdout = std::str::from_utf8(&out.stdout)?;
    let (b, c) = (stdout.find("copy b.txt"), stdout.find("copy c.txt"));
    assert!(b.is_some() && b < c, "{}", stdout);
    Ok(())
}

#[test]
fn rebuilt_intermediate_rebuilds_downstream() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "buildfile",
        &[
            COPY_RULE,
            "file src = a.txt",
            "build mid = b.txt : copy src",
            "build last = c.txt : copy mid",
            "",
        ]
        .join("\n"),
    )?;
    space.write("a.txt", "old")?;
    space.run_expect(&mut sbuild_command(vec!["last"]))?;
    space.set_mtime("a.txt", 1)?;
    space.set_mtime("b.txt", 2)?;
    space.set_mtime("c.txt", 3)?;

    space.write("a.txt", "new")?;
    space.set_mtime("a.txt", 10)?;
    let out = space.run_expect(&mut sbuild_command(vec!["last"]))?;
    assert_output_contains(&out, "ran 2 tasks");
    assert_eq!(space.read("b.txt")?, b"new");
    assert_eq!(space.read("c.txt")?, b"new");
    Ok(())
}

#[test]
fn clean_removes_outputs() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &touch_buildfile())?;
    space.write("in.txt", "")?;
    space.run_expect(&mut sbuild_command(vec![]))?;
    assert!(space.read("out.txt").is_ok());

    let out = space.run_expect(&mut sbuild_command(vec!["--clean"]))?;
    assert_output_contains(&out, "sbuild: cleaned 1 tasks");
    assert!(space.read("out.txt").is_err());
    // Sources are never touched.
    assert!(space.read("in.txt").is_ok());

    // Cleaning what is already clean is fine.
    space.run_expect(&mut sbuild_command(vec!["--clean"]))?;
    Ok(())
}

#[test]
fn config_settings_expand() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "buildfile",
        &[TOUCH_RULE, "build out = out-$variant.txt : touch", ""].join("\n"),
    )?;
    space.run_expect(&mut sbuild_command(vec!["variant=debug", "out"]))?;
    assert!(space.read("out-debug.txt").is_ok());
    Ok(())
}

#[cfg(unix)]
#[test]
fn verbose_prints_command_lines() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &touch_buildfile())?;
    space.write("in.txt", "")?;
    let out = space.run_expect(&mut sbuild_command(vec!["-v"]))?;
    assert_output_contains(&out, "touch out.txt\n");
    assert_output_not_contains(&out, "error");
    Ok(())
}

#[test]
fn failing_command() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "buildfile",
        "rule fail\n  command = echo oh no && exit 1\nbuild out = out : fail\n",
    )?;
    let out = space.run(&mut sbuild_command(vec!["out"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "sbuild: error: fail out: command failed");
    assert_output_contains(&out, "oh no");
    Ok(())
}

#[test]
fn missing_source_fails() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", &touch_buildfile())?;
    let out = space.run(&mut sbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "does not exist");
    assert!(space.read("out.txt").is_err());
    Ok(())
}

use crate::e2e::*;

fn lib_and_app(space: &TestSpace) -> anyhow::Result<()> {
    space.write("buildfile", COPY_RULE)?;
    space.write(
        "lib/buildfile",
        "file src = core.src\nbuild core = core.out : copy src\ndefault core\n",
    )?;
    space.write("lib/core.src", "core")?;
    space.write(
        "app/buildfile",
        "build app = app.out : copy ../lib/core\ndefault app\n",
    )?;
    Ok(())
}

#[test]
fn build_from_subdirectory() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    lib_and_app(&space)?;
    let out = space.run_in("lib", &mut sbuild_command(vec![]))?;
    assert!(out.status.success());
    assert_eq!(space.read("lib/core.out")?, b"core");
    assert!(space.read("app/app.out").is_err());
    Ok(())
}

#[test]
fn cross_directory_dependency() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    lib_and_app(&space)?;
    let out = space.run_expect(&mut sbuild_command(vec!["app/app"]))?;
    assert_output_contains(&out, "ran 2 tasks");
    assert_eq!(space.read("app/app.out")?, b"core");
    Ok(())
}

#[test]
fn directory_default_target() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    lib_and_app(&space)?;
    space.run_expect(&mut sbuild_command(vec!["lib/"]))?;
    assert!(space.read("lib/core.out").is_ok());
    Ok(())
}

#[test]
fn shared_dependency_runs_once() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    lib_and_app(&space)?;
    let out = space.run_expect(&mut sbuild_command(vec!["app/app", "lib/core"]))?;
    assert_output_contains(&out, "ran 2 tasks");
    Ok(())
}

#[cfg(unix)]
#[test]
fn settings_inherited_by_subdirectories() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write(
        "buildfile",
        "rule greet
  command = echo $greeting > $out
settings greet
  greeting = hello
",
    )?;
    space.write(
        "quiet/buildfile",
        "settings greet\n  greeting = hush\nbuild out = out.txt : greet\n",
    )?;
    space.write("quiet/deeper/buildfile", "build out = out.txt : greet\n")?;
    space.write("loud/buildfile", "build out = out.txt : greet\n")?;

    space.run_expect(&mut sbuild_command(vec![
        "quiet/out",
        "quiet/deeper/out",
        "loud/out",
    ]))?;
    assert_eq!(space.read("quiet/out.txt")?, b"hush\n");
    assert_eq!(space.read("quiet/deeper/out.txt")?, b"hush\n");
    assert_eq!(space.read("loud/out.txt")?, b"hello\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn commands_run_in_their_directory() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", "rule here\n  command = pwd > $out\n")?;
    space.write("sub/buildfile", "build out = out.txt : here\n")?;
    space.run_expect(&mut sbuild_command(vec!["sub/out"]))?;
    let pwd = String::from_utf8(space.read("sub/out.txt")?)?;
    assert!(pwd.trim_end().ends_with("/sub"), "{}", pwd);
    Ok(())
}

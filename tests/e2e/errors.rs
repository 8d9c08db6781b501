use crate::e2e::*;

#[test]
fn missing_root_marker() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    std::fs::remove_file(space.path("buildroot"))?;
    space.write("buildfile", "")?;
    let out = space.run(&mut sbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "\"buildroot\" was not found");
    Ok(())
}

#[test]
fn missing_buildfile() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut sbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "\"buildfile\" not found in directory \".\"");
    Ok(())
}

#[test]
fn cyclic_buildfiles() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", "")?;
    space.write("a/buildfile", "depends ../b\n")?;
    space.write("b/buildfile", "depends ../a\n")?;
    let out = space.run_in("a", &mut sbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "recursive buildfile dependencies detected: a -> b -> a");
    Ok(())
}

#[test]
fn unknown_target() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", "file a = a.txt\n")?;
    let out = space.run(&mut sbuild_command(vec!["nope"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "the target \"nope\" was not found");
    Ok(())
}

#[test]
fn no_default_target() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", "file a = a.txt\n")?;
    let out = space.run(&mut sbuild_command(vec![]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "no default target was set in \".\"");
    Ok(())
}

#[test]
fn target_without_operation() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", "file a = a.txt\n")?;
    let out = space.run(&mut sbuild_command(vec!["a"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "is not the output of any operation");
    Ok(())
}

#[test]
fn parse_error_location() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("buildfile", "file a = a.txt\nfile = b\n")?;
    let out = space.run(&mut sbuild_command(vec!["a"]))?;
    assert!(!out.status.success());
    assert_output_contains(&out, "parse error: expected identifier");
    assert_output_contains(&out, "buildfile:2: file = b");
    Ok(())
}

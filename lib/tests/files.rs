use mct_clone::{
    keyfile::{read_key_file, read_key_files, write_key_file},
    keymap::{load_key_map, save_key_map},
    profile::{Config, Profile},
    read_dump, Error, Key, KeyMap, SectorKeys, SimProvider,
};

mod helpers;
use helpers::*;

#[tokio::test(flavor = "multi_thread")]
async fn dump_keys_to_key_file() -> anyhow::Result<()> {
    init_logging();

    let dump_path = temp_path("dump.mct");
    tokio::fs::write(&dump_path, dump_lines().join("\n")).await?;

    let d = read_dump(&dump_path).await?;
    assert_eq!(d.len(), 16);

    let keys_path = temp_path("dump.keys");
    write_key_file(&keys_path, d.extracted_keys()).await?;

    let keys = read_key_file(&keys_path).await?;
    assert_eq!(keys, vec![KEY_A, KEY_B, Key::DEFAULT]);

    // Merged files are de-duplicated in file order
    let extra_path = temp_path("extra.keys");
    tokio::fs::write(&extra_path, "# extra\nFFFFFFFFFFFF\n000000000000\n").await?;

    let merged = read_key_files(&[extra_path.clone(), keys_path.clone()]).await?;
    assert_eq!(merged, vec![Key::DEFAULT, Key([0; 6]), KEY_A, KEY_B]);

    for p in [dump_path, keys_path, extra_path] {
        let _ = tokio::fs::remove_file(p).await;
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_key_file() -> anyhow::Result<()> {
    let p = temp_path("invalid.keys");
    tokio::fs::write(&p, "FFFFFFFFFFFF\nnot-a-key\n").await?;

    match read_key_file(&p).await {
        Err(Error::KeyFile { path, source }) => {
            assert_eq!(path, p);
            assert!(matches!(*source, Error::InvalidKey { line: 2, .. }));
        }
        r => panic!("unexpected result: {r:?}"),
    }

    let _ = tokio::fs::remove_file(p).await;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn key_map_file() -> anyhow::Result<()> {
    let m: KeyMap = [
        (0, SectorKeys::new(Some(Key::DEFAULT), Some(Key::DEFAULT))),
        (1, SectorKeys::new(Some(KEY_A), Some(KEY_B))),
        (10, SectorKeys::new(None, Some(KEY_B))),
    ]
    .into_iter()
    .collect();

    let p = temp_path("keys.toml");
    save_key_map(&p, &m).await?;

    let s = tokio::fs::read_to_string(&p).await?;
    assert!(s.contains("[sectors.1]"));
    assert!(s.contains("A0A1A2A3A4A5"));

    assert_eq!(load_key_map(&p).await?, m);

    let _ = tokio::fs::remove_file(p).await;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn profile_config() -> anyhow::Result<()> {
    let dir = temp_path("config");
    let p = dir.join("profiles.toml");

    // Missing config is empty
    let mut c = Config::load(&p).await?;
    assert_eq!(c.slots().filter(|(_, p)| p.is_some()).count(), 0);

    c.set(Profile {
        slot: 2,
        name: Some("Office".to_string()),
        dump: "office.mct".into(),
        key_files: vec!["std.keys".into(), "office.keys".into()],
    })?;
    c.save(&p).await?;

    let c = Config::load(&p).await?;
    assert_eq!(c.label(1), "Fast Clone 1");
    assert_eq!(c.label(2), "Office");
    assert_eq!(c.profile(2)?.key_files.len(), 2);

    let _ = tokio::fs::remove_dir_all(dir).await;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sim_provider_image() -> anyhow::Result<()> {
    let p = temp_path("image.mct");
    tokio::fs::write(&p, dump_lines().join("\n")).await?;

    let provider = SimProvider::load(&p).await?;
    let t = mct_clone::Connect::connect(&provider).await?;

    assert_eq!(t.sector_keys(1), Some((KEY_A, KEY_B)));
    assert_eq!(t.to_dump_lines(), dump_lines());

    let _ = tokio::fs::remove_file(p).await;

    Ok(())
}

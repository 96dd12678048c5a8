mod support;

use anyhow::Result;
use hpecli::backend::{current_hosts, BACKENDS};
use hpecli::context::LoginContext;
use hpecli::{greenlake, ilo, oneview};

use support::temp_store;

#[test]
fn each_backend_keeps_its_own_current_login() -> Result<()> {
    let (_dir, store) = temp_store();

    greenlake::BACKEND
        .cache(store.clone())
        .set_context("https://gl", "tenant", "gl-token")?;
    oneview::BACKEND
        .cache(store.clone())
        .set_context("https://ov", "", "ov-token")?;
    ilo::BACKEND
        .cache(store.clone())
        .set_context("https://ilo", "", "ilo-token")?;

    assert_eq!(
        greenlake::BACKEND.cache(store.clone()).get_context(),
        LoginContext::new("https://gl", "tenant", "gl-token")
    );
    assert_eq!(
        oneview::BACKEND.cache(store.clone()).get_context(),
        LoginContext::new("https://ov", "", "ov-token")
    );
    assert_eq!(
        ilo::BACKEND.cache(store.clone()).get_context(),
        LoginContext::new("https://ilo", "", "ilo-token")
    );

    let hosts: Vec<String> = current_hosts(&store).into_iter().map(|(_, h)| h).collect();
    assert_eq!(hosts, vec!["https://gl", "https://ov", "https://ilo"]);
    Ok(())
}

#[test]
fn contexts_persist_across_cache_instances() -> Result<()> {
    let (_dir, store) = temp_store();
    oneview::BACKEND
        .cache(store.clone())
        .set_context("https://ov", "", "ov-token")?;

    // A fresh cache over the same file sees the login, like a later CLI run.
    let later = oneview::BACKEND.cache(hpecli::store::Store::new(store.path()));
    assert_eq!(later.get_context().access_token, "ov-token");
    Ok(())
}

#[test]
fn corrupt_store_reads_as_logged_out_but_fails_login() -> Result<()> {
    let (_dir, store) = temp_store();
    std::fs::write(store.path(), "{ not json")?;

    for backend in BACKENDS {
        let cache = backend.cache(store.clone());
        assert!(cache.get_context().is_empty());
        assert!(cache.try_get_context().is_err());
        assert!(cache.set_context("h", "t", "v").is_err());
    }
    Ok(())
}

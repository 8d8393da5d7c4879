mod common;

use bsim_launcher::stop::{stop_simulations, StopOutcome};
use bsim_launcher::Toolchain;
use common::FakeSimulation;

#[tokio::test]
async fn test_stop_helper_outcomes() {
    // the fake installation's helper exits 1, as when nothing is running
    let fake = FakeSimulation::new(0);

    let dir = tempfile::tempdir().unwrap();
    common::write_script(&dir.path().join("components/common/stop_bsim.sh"), "exit 0");
    let succeeding = Toolchain::new(dir.path(), None);

    assert_eq!(
        stop_simulations(&succeeding).await.unwrap(),
        StopOutcome::Stopped
    );

    assert_eq!(
        stop_simulations(&fake.toolchain).await.unwrap(),
        StopOutcome::NothingStopped(Some(1))
    );
    assert!(fake.log_path("stop").exists());
}

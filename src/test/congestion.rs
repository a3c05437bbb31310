use crate::proto::{
    Aimd, CongestionAlgorithm, CongestionConfig, CongestionKind, CongestionState, Fast,
    RttEstimate, WINDOW_FLOOR, Window,
};

/// 让算法进入拥塞避免阶段，再把窗口设为 `w`
fn in_avoidance(alg: &mut dyn CongestionAlgorithm, w: f64) -> Window {
    let mut window = Window::new(1.0);
    alg.initialize(&mut window, 1.0);
    alg.handle_ack_received(&mut window, None);
    assert_eq!(alg.state(), CongestionState::CongestionAvoidance);
    window.set(w);
    window
}

#[test]
fn aimd_slow_start_adds_one_per_ack() {
    let mut alg = Aimd::default();
    let mut w = Window::new(1.0);
    alg.initialize(&mut w, 32.0);
    for _ in 0..3 {
        alg.handle_ack_received(&mut w, None);
    }
    assert_eq!(w.get(), 4.0);
    assert_eq!(alg.state(), CongestionState::SlowStart);
}

#[test]
fn aimd_switches_to_avoidance_at_ssthresh() {
    let mut alg = Aimd::default();
    let mut w = Window::new(1.0);
    alg.initialize(&mut w, 4.0);
    for _ in 0..3 {
        alg.handle_ack_received(&mut w, None);
    }
    assert_eq!(w.get(), 4.0);
    assert_eq!(alg.state(), CongestionState::CongestionAvoidance);

    alg.handle_ack_received(&mut w, None);
    assert!((w.get() - 4.25).abs() < 1e-12);
}

#[test]
fn timeout_halves_ssthresh_and_restarts() {
    let mut alg = Aimd::default();
    let mut w = in_avoidance(&mut alg, 10.0);
    alg.handle_timeout(&mut w);
    assert_eq!(w.get(), 1.0);
    assert_eq!(alg.ssthresh(), 5.0);
    assert_eq!(alg.state(), CongestionState::SlowStart);

    // 阈值不低于 1
    alg.handle_timeout(&mut w);
    assert_eq!(alg.ssthresh(), 1.0);
}

#[test]
fn duplicate_acks_only_act_in_avoidance() {
    let mut alg = Aimd::default();
    let mut w = Window::new(6.0);
    alg.initialize(&mut w, 32.0);
    alg.handle_duplicate_acks(&mut w, 3);
    assert_eq!(w.get(), 6.0);
    assert_eq!(alg.ssthresh(), 32.0);

    let mut w = in_avoidance(&mut alg, 10.0);
    alg.handle_duplicate_acks(&mut w, 3);
    assert_eq!(alg.ssthresh(), 5.0);
    assert_eq!(w.get(), 8.0);
}

#[test]
fn fast_avoidance_follows_delay_ratio() {
    let mut alg = Fast::new(0.1, 50.0);
    let mut w = in_avoidance(&mut alg, 10.0);
    let rtt = RttEstimate {
        min_secs: 0.1,
        mean_secs: 0.2,
    };
    alg.handle_ack_received(&mut w, Some(rtt));
    // 0.9·10 + 0.1·(0.5·10 + 50)
    assert!((w.get() - 14.5).abs() < 1e-9);

    // 无样本时比值取 1
    let mut w = in_avoidance(&mut alg, 10.0);
    alg.handle_ack_received(&mut w, None);
    assert!((w.get() - 15.0).abs() < 1e-9);
}

#[test]
fn fast_growth_is_capped_at_double() {
    let mut alg = Fast::new(0.5, 1_000.0);
    let mut w = in_avoidance(&mut alg, 10.0);
    alg.handle_ack_received(&mut w, None);
    assert_eq!(w.get(), 20.0);
}

#[test]
fn fast_parameters_are_clamped() {
    let alg = Fast::new(0.1, 50.0);
    assert_eq!((alg.gamma(), alg.alpha()), (0.1, 50.0));

    let mut alg = Fast::new(1.5, -3.0);
    assert_eq!((alg.gamma(), alg.alpha()), (1.0, 0.0));
    // γ=1, α=0, 比值 1：窗口保持不变
    let mut w = in_avoidance(&mut alg, 10.0);
    alg.handle_ack_received(&mut w, None);
    assert!((w.get() - 10.0).abs() < 1e-9);

    let alg = Fast::new(f64::NAN, f64::INFINITY);
    assert_eq!((alg.gamma(), alg.alpha()), (0.0, 0.0));
}

#[test]
fn fast_shares_slow_start_and_loss_handling() {
    let mut alg = Fast::new(0.1, 50.0);
    let mut w = Window::new(1.0);
    alg.initialize(&mut w, 32.0);
    alg.handle_ack_received(&mut w, None);
    assert_eq!(w.get(), 2.0);

    let mut w = in_avoidance(&mut alg, 12.0);
    alg.handle_timeout(&mut w);
    assert_eq!((w.get(), alg.ssthresh()), (1.0, 6.0));
}

#[test]
fn window_is_clamped_to_floor() {
    assert_eq!(Window::new(0.0).get(), WINDOW_FLOOR);
    assert_eq!(Window::new(-3.0).get(), WINDOW_FLOOR);
    let mut w = Window::new(2.0);
    w.set(f64::NAN);
    assert_eq!(w.get(), WINDOW_FLOOR);
    w.set(f64::INFINITY);
    assert_eq!(w.get(), WINDOW_FLOOR);
}

#[test]
fn congestion_kind_parses_tags_and_builds() {
    assert_eq!("AIMD".parse::<CongestionKind>(), Ok(CongestionKind::Aimd));
    assert_eq!(" fast ".parse::<CongestionKind>(), Ok(CongestionKind::Fast));
    assert!("cubic".parse::<CongestionKind>().is_err());

    let cfg = CongestionConfig::default();
    assert_eq!(CongestionKind::Aimd.build(&cfg).name(), "aimd");
    assert_eq!(CongestionKind::Fast.build(&cfg).name(), "fast");
}

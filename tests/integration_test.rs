// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Integration tests for the keypoint target library

use image::{Rgb, RgbImage};
use keypoint_targets::keypoint::MISSING_COORD;
use keypoint_targets::paf::put_vector;
use keypoint_targets::{
    Augmenter, Category, Keypoint, LabelAssembler, LabelConfig, SamplePipeline, SampleRecord,
    TargetError, TargetMode, Targets, Visibility,
};
use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand_pcg::Pcg32;

fn six_landmark_config() -> LabelConfig {
    LabelConfig::new()
        .with_num_landmark(6)
        .with_landmarks(Category::Blouse, &[0, 1, 2, 3])
        .with_limbs(vec![(0, 1), (1, 2), (2, 3), (0, 3)])
        .with_landmark_swap(vec![])
        .with_scale_range(200.0, 300.0)
        .with_crop_size(256)
}

fn six_keypoints() -> Vec<Keypoint> {
    vec![
        Keypoint::visible(60.0, 50.0),
        Keypoint::new(190.0, 55.0, Visibility::Occluded),
        Keypoint::missing(),
        Keypoint::visible(120.0, 210.0),
        Keypoint::missing(),
        Keypoint::missing(),
    ]
}

fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

#[test]
fn test_heatmap_scenario_256() {
    let config = six_landmark_config();
    let targets = LabelAssembler::new(&config)
        .assemble(256, 256, Category::Blouse, &six_keypoints())
        .unwrap();
    let set = targets.heatmaps()[0];

    assert_eq!(set.heatmap.shape(), &[7, 32, 32]);
    assert!(set.heatmap.iter().all(|&v| (0.0..=1.0).contains(&v)));

    let mask_value = |c: usize| -> Vec<f32> {
        set.mask.index_axis(Axis(0), c).iter().copied().collect()
    };
    // Missing landmark and the two undefined for blouses
    for c in [2, 4, 5] {
        assert!(mask_value(c).iter().all(|&v| v == 0.0));
    }
    for c in [0, 1, 3, 6] {
        assert!(mask_value(c).iter().all(|&v| v == 1.0));
    }
}

#[test]
fn test_paf_scenario_stride_one() {
    let config = LabelConfig::new()
        .with_num_landmark(2)
        .with_landmarks(Category::Trousers, &[0, 1])
        .with_limbs(vec![(0, 1)])
        .with_landmark_swap(vec![])
        .with_stride(1)
        .with_paf_thickness(1.0);
    let keypoints = [Keypoint::visible(10.0, 10.0), Keypoint::visible(10.0, 50.0)];
    let targets = LabelAssembler::new(&config)
        .assemble(64, 64, Category::Trousers, &keypoints)
        .unwrap();
    let Targets::SingleScale { paf, .. } = targets else {
        panic!("expected single-scale targets");
    };

    assert!(paf.paf[[0, 30, 10]].abs() < 1e-6);
    assert!((paf.paf[[1, 30, 10]] - 1.0).abs() < 1e-6);
    assert!(paf.paf[[0, 30, 40]].abs() < f32::EPSILON);
    assert!(paf.paf[[1, 30, 40]].abs() < f32::EPSILON);

    // Same result when rasterizing the limb directly
    let (mut px, mut py) = (Array2::zeros((64, 64)), Array2::zeros((64, 64)));
    put_vector(&mut px.view_mut(), &mut py.view_mut(), (10.0, 10.0), (10.0, 50.0), 1, 1.0);
    assert_eq!(px, paf.paf.index_axis(Axis(0), 0));
    assert_eq!(py, paf.paf.index_axis(Axis(0), 1));
}

#[test]
fn test_paf_zero_for_missing_endpoint() {
    let config = six_landmark_config();
    let targets = LabelAssembler::new(&config)
        .assemble(256, 256, Category::Blouse, &six_keypoints())
        .unwrap();
    let tensors = targets.into_tensors();
    let (paf, paf_mask) = (&tensors[1], &tensors[3]);
    // Limbs (1, 2) and (2, 3) touch the missing landmark 2
    for c in 2..6 {
        assert!(paf.index_axis(Axis(0), c).iter().all(|&v| v == 0.0));
        assert!(paf_mask.index_axis(Axis(0), c).iter().all(|&v| v == 0.0));
    }
    // Limb (0, 3) is supervised
    assert!(paf_mask.index_axis(Axis(0), 6).iter().all(|&v| v == 1.0));
}

#[test]
fn test_co_registration_through_augmenter() {
    let config = six_landmark_config().with_rot_max(40.0);
    let image = gradient_image(300, 240);
    let keypoints = six_keypoints();
    let augmenter = Augmenter::new(&config);

    for seed in 0..8 {
        let mut rng = Pcg32::seed_from_u64(seed);
        let out = augmenter.augment(&image, &keypoints, true, &mut rng).unwrap();
        assert_eq!(out.image.dimensions(), (256, 256));

        for (before, after) in keypoints.iter().zip(&out.keypoints) {
            if before.is_present() {
                let (x, y) = out.transform.apply((before.x, before.y));
                assert!((x - after.x).abs() < 1e-2, "seed {seed}: {x} vs {}", after.x);
                assert!((y - after.y).abs() < 1e-2, "seed {seed}: {y} vs {}", after.y);
                assert_eq!(after.visibility, before.visibility);
            } else {
                assert_eq!(after.x, MISSING_COORD);
                assert_eq!(after.y, MISSING_COORD);
                assert_eq!(after.visibility, Visibility::Missing);
            }
        }
    }
}

#[test]
fn test_multi_scale_pipeline() {
    let config = six_landmark_config().with_mode(TargetMode::MultiScale);
    let pipeline = SamplePipeline::new(config).unwrap().with_seed(3);
    let record = SampleRecord::new("blouse.jpg", Category::Blouse, six_keypoints());
    let sample = pipeline.process(&gradient_image(300, 240), &record, 0).unwrap();

    let sets = sample.targets.heatmaps();
    let strides: Vec<usize> = sets.iter().map(|s| s.stride).collect();
    assert_eq!(strides, vec![4, 8, 16]);
    for set in &sets {
        let side = 256 / set.stride;
        assert_eq!(set.heatmap.shape(), &[7, side, side]);
        assert!(set.heatmap.iter().all(|&v| (0.0..=1.0).contains(&v)));
        let active: Vec<bool> = set
            .mask
            .outer_iter()
            .map(|c| c.iter().all(|&v| v == 1.0))
            .collect();
        assert_eq!(active, vec![true, true, false, true, false, false, true]);
    }

    let tensors = sample.into_tensors();
    // image, then (heatmap, mask) per stride
    assert_eq!(tensors.len(), 7);
    assert_eq!(tensors[0].shape(), &[3, 256, 256]);
    assert_eq!(tensors[6].shape(), &[7, 16, 16]);
}

#[test]
fn test_default_preset_end_to_end() {
    let config = LabelConfig::default();
    let mut cells = vec!["-1_-1_-1"; 24];
    cells[15] = "120_80_1";
    cells[16] = "260_84_1";
    cells[17] = "110_300_0";
    cells[18] = "275_305_1";
    let record = SampleRecord::from_row("skirt.jpg", "skirt", &cells, config.num_landmark).unwrap();

    let pipeline = SamplePipeline::new(config).unwrap().with_training(false);
    let sample = pipeline.process(&gradient_image(400, 400), &record, 0).unwrap();
    let tensors = sample.into_tensors();

    assert_eq!(tensors[0].shape(), &[3, 368, 368]);
    assert_eq!(tensors[1].shape(), &[25, 46, 46]);
    assert_eq!(tensors[2].shape(), &[62, 46, 46]);
    assert_eq!(tensors[3].shape(), &[25, 46, 46]);
    assert_eq!(tensors[4].shape(), &[62, 46, 46]);

    // Only skirt landmarks 15..=18 and the background are supervised
    for c in 0..25 {
        let on = tensors[3].index_axis(Axis(0), c).iter().all(|&v| v == 1.0);
        assert_eq!(on, (15..=18).contains(&c) || c == 24, "channel {c}");
    }
}

#[test]
fn test_json_config_round_trip() {
    let config = six_landmark_config().with_sigma(5.0);
    let json = config.to_json_string().unwrap();
    let loaded = LabelConfig::from_json_str(&json).unwrap();
    assert_eq!(loaded.num_landmark, 6);
    assert!((loaded.sigma - 5.0).abs() < f32::EPSILON);
    assert_eq!(
        loaded.landmarks_for(Category::Blouse).unwrap(),
        config.landmarks_for(Category::Blouse).unwrap()
    );
    assert!(loaded.landmarks_for(Category::Dress).is_err());
}

#[test]
fn test_errors_surface_through_pipeline() {
    let pipeline = SamplePipeline::new(six_landmark_config()).unwrap();
    let image = gradient_image(64, 64);

    let empty = SampleRecord::new("empty.jpg", Category::Blouse, vec![Keypoint::missing(); 6]);
    assert!(matches!(
        pipeline.process(&image, &empty, 0),
        Err(TargetError::DegenerateKeypoints(_))
    ));

    let unknown = SampleRecord::new("dress.jpg", Category::Dress, six_keypoints());
    assert!(matches!(
        pipeline.process(&image, &unknown, 0),
        Err(TargetError::UnknownCategory(_))
    ));
}

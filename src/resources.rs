use crate::cli::DownloadConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Checkpoint,
    Controlnet,
    Upscaler,
    Preprocessor,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdVersion {
    Sd15,
    Sdxl,
    /// Not tied to a base model, survives both family exclusions.
    All,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ModelFile {
    /// Destination path relative to the ComfyUI directory.
    pub path: &'static str,
    pub url: &'static str,
}

/// One named model entry with one or more destination files.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelResource {
    pub name: &'static str,
    pub kind: ResourceKind,
    pub version: SdVersion,
    pub files: &'static [ModelFile],
}

/// Models the plugin cannot run without.
pub const REQUIRED_MODELS: &[ModelResource] = &[
    ModelResource {
        name: "ControlNet Scribble",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_lora_rank128_v11p_sd15_scribble_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_lora_rank128_v11p_sd15_scribble_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Inpaint",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_v11p_sd15_inpaint_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_v11p_sd15_inpaint_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "CLIP Vision model",
        kind: ResourceKind::Other,
        version: SdVersion::All,
        files: &[ModelFile {
            path: "models/clip_vision/clip-vision_vit-h.safetensors",
            url: "https://huggingface.co/h94/IP-Adapter/resolve/main/models/image_encoder/model.safetensors",
        }],
    },
    ModelResource {
        name: "IP-Adapter (SD1.5)",
        kind: ResourceKind::Other,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/ipadapter/ip-adapter_sd15.safetensors",
            url: "https://huggingface.co/h94/IP-Adapter/resolve/main/models/ip-adapter_sd15.safetensors",
        }],
    },
    ModelResource {
        name: "IP-Adapter (SDXL)",
        kind: ResourceKind::Other,
        version: SdVersion::Sdxl,
        files: &[ModelFile {
            path: "models/ipadapter/ip-adapter_sdxl_vit-h.safetensors",
            url: "https://huggingface.co/h94/IP-Adapter/resolve/main/sdxl_models/ip-adapter_sdxl_vit-h.safetensors",
        }],
    },
    ModelResource {
        name: "NMKD Superscale model",
        kind: ResourceKind::Upscaler,
        version: SdVersion::All,
        files: &[ModelFile {
            path: "models/upscale_models/4x_NMKD-Superscale-SP_178000_G.pth",
            url: "https://huggingface.co/gemasai/4x_NMKD-Superscale-SP_178000_G/resolve/main/4x_NMKD-Superscale-SP_178000_G.pth",
        }],
    },
];

/// Checkpoints offered during first-run setup. The first entry is the one
/// the minimal set falls back to.
pub const DEFAULT_CHECKPOINTS: &[ModelResource] = &[
    ModelResource {
        name: "Realistic Vision",
        kind: ResourceKind::Checkpoint,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/checkpoints/realisticVisionV51_v51VAE.safetensors",
            url: "https://civitai.com/api/download/models/130072",
        }],
    },
    ModelResource {
        name: "DreamShaper",
        kind: ResourceKind::Checkpoint,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/checkpoints/dreamshaper_8.safetensors",
            url: "https://civitai.com/api/download/models/128713",
        }],
    },
    ModelResource {
        name: "Flat2D Animerge",
        kind: ResourceKind::Checkpoint,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/checkpoints/flat2DAnimerge_v45Sharp.safetensors",
            url: "https://civitai.com/api/download/models/266360",
        }],
    },
    ModelResource {
        name: "Juggernaut XL",
        kind: ResourceKind::Checkpoint,
        version: SdVersion::Sdxl,
        files: &[ModelFile {
            path: "models/checkpoints/juggernautXL_version6Rundiffusion.safetensors",
            url: "https://civitai.com/api/download/models/198530",
        }],
    },
];

pub const UPSCALE_MODELS: &[ModelResource] = &[ModelResource {
    name: "OmniSR",
    kind: ResourceKind::Upscaler,
    version: SdVersion::All,
    files: &[
        ModelFile {
            path: "models/upscale_models/OmniSR_X2_DIV2K.safetensors",
            url: "https://huggingface.co/Acly/Omni-SR/resolve/main/OmniSR_X2_DIV2K.safetensors",
        },
        ModelFile {
            path: "models/upscale_models/OmniSR_X3_DIV2K.safetensors",
            url: "https://huggingface.co/Acly/Omni-SR/resolve/main/OmniSR_X3_DIV2K.safetensors",
        },
        ModelFile {
            path: "models/upscale_models/OmniSR_X4_DIV2K.safetensors",
            url: "https://huggingface.co/Acly/Omni-SR/resolve/main/OmniSR_X4_DIV2K.safetensors",
        },
    ],
}];

/// Models for features which work without them but benefit from having them.
pub const OPTIONAL_MODELS: &[ModelResource] = &[
    ModelResource {
        name: "ControlNet Line Art",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_v11p_sd15_lineart_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_v11p_sd15_lineart_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Soft Edge",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_v11p_sd15_softedge_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_v11p_sd15_softedge_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Canny Edge",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_v11p_sd15_canny_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_v11p_sd15_canny_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Depth",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_lora_rank128_v11f1p_sd15_depth_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_lora_rank128_v11f1p_sd15_depth_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Normal",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_v11p_sd15_normalbae_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_v11p_sd15_normalbae_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Pose",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_lora_rank128_v11p_sd15_openpose_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_lora_rank128_v11p_sd15_openpose_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Segmentation",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_lora_rank128_v11p_sd15_seg_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_lora_rank128_v11p_sd15_seg_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Unblur",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_lora_rank128_v11f1e_sd15_tile_fp16.safetensors",
            url: "https://huggingface.co/comfyanonymous/ControlNet-v1-1_fp16_safetensors/resolve/main/control_lora_rank128_v11f1e_sd15_tile_fp16.safetensors",
        }],
    },
    ModelResource {
        name: "ControlNet Stencil",
        kind: ResourceKind::Controlnet,
        version: SdVersion::Sd15,
        files: &[ModelFile {
            path: "models/controlnet/control_v1p_sd15_qrcode_monster.safetensors",
            url: "https://huggingface.co/monster-labs/control_v1p_sd15_qrcode_monster/resolve/main/control_v1p_sd15_qrcode_monster.safetensors",
        }],
    },
];

/// Annotator models which the server pulls on first use. Only fetched ahead
/// of time on request.
pub const PREFETCH_MODELS: &[ModelResource] = &[
    ModelResource {
        name: "Scribble Preprocessor",
        kind: ResourceKind::Preprocessor,
        version: SdVersion::All,
        files: &[ModelFile {
            path: "custom_nodes/comfyui_controlnet_aux/ckpts/lllyasviel/Annotators/table5_pidinet.pth",
            url: "https://huggingface.co/lllyasviel/Annotators/resolve/main/table5_pidinet.pth",
        }],
    },
    ModelResource {
        name: "Line Art Preprocessor",
        kind: ResourceKind::Preprocessor,
        version: SdVersion::All,
        files: &[
            ModelFile {
                path: "custom_nodes/comfyui_controlnet_aux/ckpts/lllyasviel/Annotators/sk_model.pth",
                url: "https://huggingface.co/lllyasviel/Annotators/resolve/main/sk_model.pth",
            },
            ModelFile {
                path: "custom_nodes/comfyui_controlnet_aux/ckpts/lllyasviel/Annotators/sk_model2.pth",
                url: "https://huggingface.co/lllyasviel/Annotators/resolve/main/sk_model2.pth",
            },
        ],
    },
    ModelResource {
        name: "Soft Edge Preprocessor",
        kind: ResourceKind::Preprocessor,
        version: SdVersion::All,
        files: &[ModelFile {
            path: "custom_nodes/comfyui_controlnet_aux/ckpts/lllyasviel/Annotators/ControlNetHED.pth",
            url: "https://huggingface.co/lllyasviel/Annotators/resolve/main/ControlNetHED.pth",
        }],
    },
    ModelResource {
        name: "Depth Preprocessor",
        kind: ResourceKind::Preprocessor,
        version: SdVersion::All,
        files: &[ModelFile {
            path: "custom_nodes/comfyui_controlnet_aux/ckpts/lllyasviel/Annotators/res101.pth",
            url: "https://huggingface.co/lllyasviel/Annotators/resolve/main/res101.pth",
        }],
    },
    ModelResource {
        name: "Pose Preprocessor",
        kind: ResourceKind::Preprocessor,
        version: SdVersion::All,
        files: &[
            ModelFile {
                path: "custom_nodes/comfyui_controlnet_aux/ckpts/lllyasviel/Annotators/body_pose_model.pth",
                url: "https://huggingface.co/lllyasviel/Annotators/resolve/main/body_pose_model.pth",
            },
            ModelFile {
                path: "custom_nodes/comfyui_controlnet_aux/ckpts/lllyasviel/Annotators/hand_pose_model.pth",
                url: "https://huggingface.co/lllyasviel/Annotators/resolve/main/hand_pose_model.pth",
            },
            ModelFile {
                path: "custom_nodes/comfyui_controlnet_aux/ckpts/lllyasviel/Annotators/facenet.pth",
                url: "https://huggingface.co/lllyasviel/Annotators/resolve/main/facenet.pth",
            },
        ],
    },
];

/// Minimum viable set: everything required plus one default checkpoint.
pub fn required_models() -> impl Iterator<Item = &'static ModelResource> {
    REQUIRED_MODELS.iter().chain(DEFAULT_CHECKPOINTS.iter().take(1))
}

/// The full catalog in download order.
pub fn all_models() -> impl Iterator<Item = &'static ModelResource> {
    REQUIRED_MODELS
        .iter()
        .chain(DEFAULT_CHECKPOINTS.iter())
        .chain(UPSCALE_MODELS.iter())
        .chain(OPTIONAL_MODELS.iter())
        .chain(PREFETCH_MODELS.iter())
}

/// Apply the configured exclusions, preserving catalog order.
pub fn select(config: &DownloadConfig) -> Vec<&'static ModelResource> {
    let models: Vec<&'static ModelResource> = if config.minimal {
        required_models().collect()
    } else {
        all_models().collect()
    };
    models
        .into_iter()
        .filter(|model| !excluded(model, config))
        .collect()
}

fn excluded(model: &ModelResource, config: &DownloadConfig) -> bool {
    (config.no_sd15 && model.version == SdVersion::Sd15)
        || (config.no_sdxl && model.version == SdVersion::Sdxl)
        || (config.no_controlnet && model.kind == ResourceKind::Controlnet)
        || (config.no_upscalers && model.kind == ResourceKind::Upscaler)
        || (config.no_checkpoints && model.kind == ResourceKind::Checkpoint)
        || (!config.prefetch && model.kind == ResourceKind::Preprocessor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn config() -> DownloadConfig {
        DownloadConfig {
            destination: PathBuf::from("models"),
            verbose: false,
            dry_run: false,
            no_sd15: false,
            no_sdxl: false,
            no_checkpoints: false,
            no_upscalers: false,
            no_controlnet: false,
            prefetch: false,
            minimal: false,
            no_head_request: false,
        }
    }

    fn names(models: &[&'static ModelResource]) -> Vec<&'static str> {
        models.iter().map(|m| m.name).collect()
    }

    #[test]
    fn test_catalog_integrity() {
        let mut seen = HashSet::new();
        for model in all_models() {
            assert!(seen.insert(model.name), "duplicate name: {}", model.name);
            assert!(!model.files.is_empty(), "{} has no files", model.name);
            for file in model.files {
                assert!(!file.path.starts_with('/'), "{}: absolute path", model.name);
                assert!(!file.path.contains('\\'), "{}: backslash in path", model.name);
                assert!(!file.path.contains(".."), "{}: parent traversal", model.name);
                let url = url::Url::parse(file.url).expect("catalog URL must parse");
                assert_eq!(url.scheme(), "https", "{}: non-https URL", model.name);
            }
        }
    }

    #[test]
    fn test_required_set_has_one_checkpoint() {
        let checkpoints: Vec<_> = required_models()
            .filter(|m| m.kind == ResourceKind::Checkpoint)
            .collect();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].name, DEFAULT_CHECKPOINTS[0].name);
    }

    #[test]
    fn test_default_selection_excludes_preprocessors() {
        let selected = select(&config());
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|m| m.kind != ResourceKind::Preprocessor));
    }

    #[test]
    fn test_prefetch_includes_preprocessors() {
        let cfg = DownloadConfig {
            prefetch: true,
            ..config()
        };
        let selected = select(&cfg);
        assert!(names(&selected).contains(&"Pose Preprocessor"));
        assert_eq!(selected.len(), all_models().count());
    }

    #[test]
    fn test_family_exclusions() {
        let cfg = DownloadConfig {
            no_sd15: true,
            ..config()
        };
        let selected = select(&cfg);
        assert!(selected.iter().all(|m| m.version != SdVersion::Sd15));
        // Entries without a family survive family flags.
        assert!(names(&selected).contains(&"CLIP Vision model"));

        let cfg = DownloadConfig {
            no_sdxl: true,
            ..config()
        };
        let selected = select(&cfg);
        assert!(selected.iter().all(|m| m.version != SdVersion::Sdxl));
        assert!(names(&selected).contains(&"Realistic Vision"));
    }

    #[test]
    fn test_kind_exclusions() {
        let cfg = DownloadConfig {
            no_checkpoints: true,
            no_upscalers: true,
            no_controlnet: true,
            ..config()
        };
        let selected = select(&cfg);
        assert!(selected.iter().all(|m| m.kind == ResourceKind::Other));
        assert_eq!(
            names(&selected),
            vec!["CLIP Vision model", "IP-Adapter (SD1.5)", "IP-Adapter (SDXL)"]
        );
    }

    #[test]
    fn test_exclusions_are_or_combined() {
        let cfg = DownloadConfig {
            no_sd15: true,
            no_checkpoints: true,
            ..config()
        };
        for model in select(&cfg) {
            assert_ne!(model.version, SdVersion::Sd15);
            assert_ne!(model.kind, ResourceKind::Checkpoint);
        }
    }

    #[test]
    fn test_selection_preserves_catalog_order() {
        let order: Vec<&'static str> = all_models().map(|m| m.name).collect();
        let cfg = DownloadConfig {
            no_controlnet: true,
            prefetch: true,
            ..config()
        };
        let positions: Vec<usize> = select(&cfg)
            .iter()
            .map(|m| order.iter().position(|n| *n == m.name).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_minimal_is_strict_subset() {
        // --minimal forces --no-sdxl, so compare against the same flags.
        let full = DownloadConfig {
            no_sdxl: true,
            ..config()
        };
        let minimal = DownloadConfig {
            minimal: true,
            ..full.clone()
        };
        let full_names = names(&select(&full));
        let minimal_names = names(&select(&minimal));
        assert!(minimal_names.len() < full_names.len());
        assert!(minimal_names.iter().all(|n| full_names.contains(n)));
    }

    #[test]
    fn test_minimal_selection() {
        let cfg = DownloadConfig {
            minimal: true,
            no_sdxl: true,
            ..config()
        };
        assert_eq!(
            names(&select(&cfg)),
            vec![
                "ControlNet Scribble",
                "ControlNet Inpaint",
                "CLIP Vision model",
                "IP-Adapter (SD1.5)",
                "NMKD Superscale model",
                "Realistic Vision",
            ]
        );
    }
}

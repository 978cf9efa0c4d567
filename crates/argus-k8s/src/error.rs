// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum K8sError {
	#[error("Kubernetes API error: {0}")]
	Api(#[from] kube::Error),

	#[error("Watch stream error: {0}")]
	Stream(String),
}

pub type Result<T> = std::result::Result<T, K8sError>;

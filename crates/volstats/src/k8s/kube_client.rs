use std::path::Path;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::k8s::KubernetesError;

async fn load_config(kubeconfig: Option<&Path>) -> Result<Config, Report<KubernetesError>> {
    let Some(path) = kubeconfig else {
        return Config::infer()
            .await
            .change_context(KubernetesError::ClientSetup)
            .attach_printable("No in-cluster environment or default kubeconfig found");
    };

    let to_error = || KubernetesError::Kubeconfig {
        path: path.to_path_buf(),
    };
    let kubeconfig = Kubeconfig::read_from(path).change_context_lazy(to_error)?;
    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .change_context_lazy(to_error)
}

/// Client for the cluster in `kubeconfig`, or the in-cluster / `~/.kube/config`
/// cluster when no file is given.
pub async fn init_kube_client(
    kubeconfig: Option<&Path>,
) -> Result<Client, Report<KubernetesError>> {
    let config = load_config(kubeconfig).await?;
    Client::try_from(config).change_context(KubernetesError::ClientSetup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_kubeconfig_names_path() {
        let path = Path::new("/nonexistent/volstats/kubeconfig");

        let err = init_kube_client(Some(path))
            .await
            .err()
            .expect("expected kubeconfig error");

        assert!(matches!(
            err.current_context(),
            KubernetesError::Kubeconfig { path: p } if p == path
        ));
    }
}

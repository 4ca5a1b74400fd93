#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::compute::{Firewall, FirewallList};
    use crate::api::ResourceId;
    use crate::resources::project::fake::{active_project, provider_data, FakeGoogle};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn reconciler(fake: &Arc<FakeGoogle>) -> ProjectReconciler {
        ProjectReconciler::new(provider_data(fake))
    }

    fn existing(fake: &Arc<FakeGoogle>) -> ProjectModel {
        let mut project = active_project("p1", "Test");
        project.parent = Some(ResourceId::organization("1234"));
        project.labels = BTreeMap::from([("env".to_string(), "dev".to_string())]);
        fake.insert_project(project);

        ProjectModel {
            id: Some("p1".to_string()),
            project_id: "p1".to_string(),
            name: "Test".to_string(),
            org_id: "1234".to_string(),
            number: "1234567890".to_string(),
            labels: BTreeMap::from([("env".to_string(), "dev".to_string())]),
            ..Default::default()
        }
    }

    fn firewall(name: &str) -> Firewall {
        Firewall {
            name: name.to_string(),
            network: network_self_link("p1", "default"),
        }
    }

    #[tokio::test]
    async fn test_create_without_default_network() {
        let fake = FakeGoogle::new();
        fake.state().firewall_pages = vec![
            FirewallList {
                items: vec![firewall("allow-icmp"), firewall("allow-ssh")],
                next_page_token: Some("page-1".to_string()),
            },
            FirewallList {
                items: vec![firewall("allow-internal")],
                next_page_token: None,
            },
        ];

        let mut model = ProjectModel {
            project_id: "p1".to_string(),
            name: "Test".to_string(),
            auto_create_network: false,
            ..Default::default()
        };
        reconciler(&fake).create(&mut model).await.unwrap();

        let filter = "network eq https://www.googleapis.com/compute/v1/projects/p1/global/networks/default";
        assert_eq!(
            fake.calls(),
            vec![
                "create_project:p1".to_string(),
                "wait_project_operation:operations/cp.p1:project to create".to_string(),
                "get_project:p1".to_string(),
                "get_billing_info:p1".to_string(),
                "enable_service:p1:compute.googleapis.com".to_string(),
                "wait_service_operation:operations/acf.p1:api to enable".to_string(),
                format!("list_firewalls:p1:{}:", filter),
                "delete_firewall:p1:allow-icmp".to_string(),
                "wait_compute_operation:p1:delete-allow-icmp:Deleting Firewall".to_string(),
                "delete_firewall:p1:allow-ssh".to_string(),
                "wait_compute_operation:p1:delete-allow-ssh:Deleting Firewall".to_string(),
                format!("list_firewalls:p1:{}:page-1", filter),
                "delete_firewall:p1:allow-internal".to_string(),
                "wait_compute_operation:p1:delete-allow-internal:Deleting Firewall".to_string(),
                "delete_network:p1:default".to_string(),
                "wait_compute_operation:p1:delete-default:Deleting Network".to_string(),
            ]
        );

        assert_eq!(model.id.as_deref(), Some("p1"));
        assert_eq!(model.number, "1234567890");
        assert_eq!(model.name, "Test");
        assert_eq!(model.billing_account, "");
        assert!(!model.auto_create_network);
    }

    #[tokio::test]
    async fn test_create_keeps_default_network_by_default() {
        let fake = FakeGoogle::new();
        let mut model = ProjectModel {
            project_id: "p1".to_string(),
            name: "Test".to_string(),
            folder_id: "folders/42".to_string(),
            ..Default::default()
        };
        reconciler(&fake).create(&mut model).await.unwrap();

        assert_eq!(fake.count("enable_service"), 0);
        assert_eq!(fake.count("list_firewalls"), 0);
        assert_eq!(
            fake.state().projects["p1"].parent,
            Some(ResourceId::folder("42"))
        );
        assert_eq!(model.folder_id, "42");
    }

    #[tokio::test]
    async fn test_create_wait_failure_clears_id() {
        let fake = FakeGoogle::new();
        fake.fail("wait_project_operation");

        let mut model = ProjectModel {
            project_id: "p1".to_string(),
            name: "Test".to_string(),
            ..Default::default()
        };
        let err = reconciler(&fake).create(&mut model).await.unwrap_err();

        assert!(matches!(err, ProjectError::CreateWait(_)));
        assert_eq!(model.id, None);
    }

    #[tokio::test]
    async fn test_create_submission_failure_leaves_no_id() {
        let fake = FakeGoogle::new();
        fake.fail("create_project");

        let mut model = ProjectModel {
            project_id: "p1".to_string(),
            name: "Test".to_string(),
            ..Default::default()
        };
        let err = reconciler(&fake).create(&mut model).await.unwrap_err();

        assert!(err.to_string().starts_with("Error creating project p1 (Test): "));
        assert_eq!(model.id, None);
        assert_eq!(fake.count("wait_project_operation"), 0);
    }

    #[tokio::test]
    async fn test_create_links_billing_account() {
        let fake = FakeGoogle::new();
        let mut model = ProjectModel {
            project_id: "p1".to_string(),
            name: "Test".to_string(),
            billing_account: "0123-4567".to_string(),
            ..Default::default()
        };
        reconciler(&fake).create(&mut model).await.unwrap();

        assert_eq!(model.billing_account, "0123-4567");
        assert_eq!(
            fake.state().billing_requests[0].billing_account_name.as_deref(),
            Some("billingAccounts/0123-4567")
        );
    }

    #[tokio::test]
    async fn test_create_enable_compute_failure() {
        let fake = FakeGoogle::new();
        fake.fail("enable_service");

        let mut model = ProjectModel {
            project_id: "p1".to_string(),
            name: "Test".to_string(),
            auto_create_network: false,
            ..Default::default()
        };
        let err = reconciler(&fake).create(&mut model).await.unwrap_err();

        assert!(matches!(err, ProjectError::EnableCompute(_)));
        assert!(err
            .to_string()
            .starts_with("Error enabling the Compute Engine API"));
        assert_eq!(model.id.as_deref(), Some("p1"));
        assert_eq!(fake.count("list_firewalls"), 0);
    }

    #[tokio::test]
    async fn test_create_default_network_failure() {
        let fake = FakeGoogle::new();
        fake.fail("list_firewalls");

        let mut model = ProjectModel {
            project_id: "p1".to_string(),
            name: "Test".to_string(),
            auto_create_network: false,
            ..Default::default()
        };
        let err = reconciler(&fake).create(&mut model).await.unwrap_err();

        assert!(err
            .to_string()
            .starts_with("Error deleting default network in project p1"));
        assert_eq!(fake.count("delete_network"), 0);
    }

    #[tokio::test]
    async fn test_force_delete_network_aborts_on_firewall_failure() {
        let fake = FakeGoogle::new();
        fake.state().firewall_pages = vec![FirewallList {
            items: vec![firewall("a"), firewall("b")],
            next_page_token: None,
        }];
        fake.fail("delete_firewall");

        let err = reconciler(&fake)
            .force_delete_network("p1", "default")
            .await
            .unwrap_err();

        assert!(matches!(err, ProjectError::DeleteFirewall { ref firewall, .. } if firewall == "a"));
        assert_eq!(fake.count("delete_firewall"), 1);
        assert_eq!(fake.count("delete_network"), 0);
    }

    #[tokio::test]
    async fn test_read_populates_record() {
        let fake = FakeGoogle::new();
        let mut project = active_project("p1", "Remote Name");
        project.parent = Some(ResourceId::folder("42"));
        project.labels = BTreeMap::from([("team".to_string(), "infra".to_string())]);
        fake.insert_project(project);
        fake.state()
            .billing
            .insert("p1".to_string(), "billingAccounts/0123".to_string());

        let mut model = ProjectModel {
            org_id: "stale".to_string(),
            ..ProjectModel::imported("p1")
        };
        reconciler(&fake).read(&mut model).await.unwrap();

        assert_eq!(model.name, "Remote Name");
        assert_eq!(model.number, "1234567890");
        assert_eq!(model.folder_id, "42");
        assert_eq!(model.org_id, "");
        assert_eq!(model.billing_account, "0123");
        assert_eq!(model.labels.get("team").map(String::as_str), Some("infra"));
    }

    #[tokio::test]
    async fn test_read_not_found_clears_id() {
        let fake = FakeGoogle::new();
        let mut model = ProjectModel::imported("gone");

        reconciler(&fake).read(&mut model).await.unwrap();

        assert_eq!(model.id, None);
        assert_eq!(fake.count("get_billing_info"), 0);
    }

    #[tokio::test]
    async fn test_read_inactive_project_clears_id() {
        let fake = FakeGoogle::new();
        let mut project = active_project("p1", "Test");
        project.lifecycle_state = "DELETE_REQUESTED".to_string();
        fake.insert_project(project);

        let mut model = ProjectModel::imported("p1");
        reconciler(&fake).read(&mut model).await.unwrap();

        assert_eq!(model.id, None);
    }

    #[tokio::test]
    async fn test_read_other_errors_are_fatal() {
        let fake = FakeGoogle::new();
        fake.fail("get_project");

        let mut model = ProjectModel::imported("p1");
        let err = reconciler(&fake).read(&mut model).await.unwrap_err();

        assert!(matches!(err, ProjectError::Read { .. }));
        assert_eq!(model.id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_read_rejects_unprefixed_billing_account() {
        let fake = FakeGoogle::new();
        fake.insert_project(active_project("p1", "Test"));
        fake.state()
            .billing
            .insert("p1".to_string(), "0123".to_string());

        let mut model = ProjectModel::imported("p1");
        let err = reconciler(&fake).read(&mut model).await.unwrap_err();

        assert!(matches!(err, ProjectError::BillingParse { .. }));
    }

    #[tokio::test]
    async fn test_update_labels_only() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        let mut desired = model.clone();
        desired.labels = BTreeMap::from([("env".to_string(), "prod".to_string())]);

        reconciler(&fake)
            .update(&mut model, &desired, &ChangeSet::of(["labels"]))
            .await
            .unwrap();

        let state = fake.state();
        assert_eq!(state.project_updates.len(), 1);
        let sent = &state.project_updates[0];
        assert_eq!(sent.labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(sent.name, "Test");
        assert_eq!(sent.parent, Some(ResourceId::organization("1234")));
        assert!(state.billing_requests.is_empty());
        drop(state);

        assert_eq!(model.labels.get("env").map(String::as_str), Some("prod"));
    }

    #[tokio::test]
    async fn test_update_builds_on_previous_result() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        let mut desired = model.clone();
        desired.name = "Renamed".to_string();
        desired.org_id.clear();
        desired.folder_id = "folders/42".to_string();

        reconciler(&fake)
            .update(
                &mut model,
                &desired,
                &ChangeSet::of(["name", "org_id", "folder_id"]),
            )
            .await
            .unwrap();

        let updates = fake.state().project_updates.clone();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].name, "Renamed");
        assert_eq!(updates[0].parent, Some(ResourceId::organization("1234")));
        assert_eq!(updates[1].name, "Renamed");
        assert_eq!(updates[1].parent, Some(ResourceId::folder("42")));
        assert_eq!(model.name, "Renamed");
        assert_eq!(model.folder_id, "42");
        assert_eq!(model.org_id, "");
    }

    #[tokio::test]
    async fn test_update_without_parent_keeps_current_parent() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        let mut desired = model.clone();
        desired.org_id.clear();

        reconciler(&fake)
            .update(&mut model, &desired, &ChangeSet::of(["org_id"]))
            .await
            .unwrap();

        assert_eq!(fake.count("update_project"), 0);
        assert_eq!(model.org_id, "1234");
    }

    #[tokio::test]
    async fn test_update_missing_project() {
        let fake = FakeGoogle::new();
        let mut model = ProjectModel::imported("p1");
        let desired = model.clone();

        let err = reconciler(&fake)
            .update(&mut model, &desired, &ChangeSet::of(["name"]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Project \"p1\" does not exist.");
    }

    #[tokio::test]
    async fn test_update_stops_at_first_failure() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        let mut desired = model.clone();
        desired.name = "Renamed".to_string();
        desired.billing_account = "0123".to_string();
        fake.fail("update_project");

        let err = reconciler(&fake)
            .update(
                &mut model,
                &desired,
                &ChangeSet::of(["name", "billing_account"]),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Error updating project \"Renamed\""));
        assert_eq!(fake.count("update_billing_info"), 0);
        assert_eq!(model.name, "Test");
        assert_eq!(model.billing_account, "");
    }

    #[tokio::test]
    async fn test_update_keeps_applied_rename_when_billing_fails() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        let mut desired = model.clone();
        desired.name = "Renamed".to_string();
        desired.billing_account = "0123".to_string();
        desired.labels = BTreeMap::from([("env".to_string(), "prod".to_string())]);
        fake.fail("update_billing_info");

        let err = reconciler(&fake)
            .update(
                &mut model,
                &desired,
                &ChangeSet::of(["name", "billing_account", "labels"]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProjectError::SetBilling { .. }));
        assert_eq!(fake.count("update_project"), 1);
        assert_eq!(model.name, "Renamed");
        assert_eq!(model.billing_account, "");
        assert_eq!(model.labels.get("env").map(String::as_str), Some("dev"));
    }

    #[tokio::test]
    async fn test_update_billing_then_labels_uses_desired_labels() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        let mut desired = model.clone();
        desired.billing_account = "0123".to_string();
        desired.labels = BTreeMap::from([("env".to_string(), "prod".to_string())]);

        reconciler(&fake)
            .update(
                &mut model,
                &desired,
                &ChangeSet::of(["billing_account", "labels"]),
            )
            .await
            .unwrap();

        assert_eq!(model.billing_account, "0123");
        assert_eq!(model.labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(
            fake.state().project_updates[0].labels.get("env").map(String::as_str),
            Some("prod")
        );
    }

    #[tokio::test]
    async fn test_unlink_billing_sends_empty_body_and_converges() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        {
            let mut state = fake.state();
            state
                .billing
                .insert("p1".to_string(), "billingAccounts/0123".to_string());
            state.billing_lag = 2;
        }
        model.billing_account.clear();

        reconciler(&fake)
            .update_billing_account(&mut model)
            .await
            .unwrap();

        let state = fake.state();
        assert_eq!(state.billing_requests.len(), 1);
        assert_eq!(state.billing_requests[0].billing_account_name, None);
        assert_eq!(
            serde_json::to_string(&state.billing_requests[0]).unwrap(),
            "{}"
        );
        drop(state);

        assert_eq!(fake.count("get_billing_info"), 3);
        assert_eq!(model.billing_account, "");
    }

    #[tokio::test]
    async fn test_billing_never_matches_times_out() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        {
            let mut state = fake.state();
            state
                .billing
                .insert("p1".to_string(), "billingAccounts/old".to_string());
            state.billing_never_applies = true;
        }
        let mut desired = model.clone();
        desired.billing_account = "new".to_string();

        let err = reconciler(&fake)
            .update(&mut model, &desired, &ChangeSet::of(["billing_account"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProjectError::BillingTimeout { ref desired, ref observed }
                if desired == "new" && observed == "old"
        ));
        assert_eq!(fake.count("get_billing_info"), 3);
        assert_eq!(model.billing_account, "old");
    }

    #[tokio::test]
    async fn test_billing_submission_failure_resets_field() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        model.billing_account = "0123".to_string();
        fake.fail("update_billing_info");

        let err = reconciler(&fake)
            .update_billing_account(&mut model)
            .await
            .unwrap_err();

        assert!(matches!(err, ProjectError::SetBilling { .. }));
        assert_eq!(model.billing_account, "");
        assert_eq!(fake.count("get_billing_info"), 0);
    }

    #[tokio::test]
    async fn test_delete_skip_delete() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        model.skip_delete = true;

        reconciler(&fake).delete(&mut model).await.unwrap();

        assert_eq!(model.id, None);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_project() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);

        reconciler(&fake).delete(&mut model).await.unwrap();

        assert_eq!(model.id, None);
        assert_eq!(fake.calls(), vec!["delete_project:p1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_id() {
        let fake = FakeGoogle::new();
        let mut model = existing(&fake);
        fake.fail("delete_project");

        let err = reconciler(&fake).delete(&mut model).await.unwrap_err();

        assert!(matches!(err, ProjectError::Delete { .. }));
        assert_eq!(model.id.as_deref(), Some("p1"));
    }
}

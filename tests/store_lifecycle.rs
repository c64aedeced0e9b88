use waterberry_crm_lib::core::CrmCore;
use waterberry_crm_lib::models::{
    CustomerUpdate, LeadStatus, NewCustomer, NewLead, NewTicket, Priority, SignInPayload,
};

fn open_core(dir: &tempfile::TempDir) -> CrmCore {
    CrmCore::new(dir.path()).expect("core")
}

#[test]
fn full_crm_flow_over_a_fresh_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let core = open_core(&dir);

    // Gate is closed until the operator signs in.
    assert!(!core.session_status().authenticated);
    assert!(core
        .sign_in(SignInPayload {
            email: "admin@waterberry.app".to_string(),
            password: "waterberry-local".to_string(),
        })
        .success);

    // Fresh database serves seeds everywhere except leads.
    assert!(core.leads().is_empty());
    assert_eq!(core.customers().len(), 2);
    assert_eq!(core.sales().len(), 2);
    assert_eq!(core.tasks().len(), 1);
    assert_eq!(core.employees().len(), 2);
    assert_eq!(core.tickets().len(), 1);

    // Lead lifecycle: create, then persist a status transition.
    let lead = core.add_lead(NewLead {
        name: "X".to_string(),
        email: "x@y.com".to_string(),
        company: "Y".to_string(),
        status: None,
        source: "expo".to_string(),
        assigned_to: "dana".to_string(),
        avatar: None,
    });
    assert!(!lead.id.is_empty());
    assert_eq!(lead.status, LeadStatus::New);
    core.set_lead_status(&lead.id, LeadStatus::Converted)
        .expect("transition");
    assert_eq!(core.leads()[0].status, LeadStatus::Converted);

    // Customer lifecycle: create, tag, annotate.
    let customer = core.add_customer(NewCustomer {
        name: "New Co".to_string(),
        company: "New Co Ltd".to_string(),
        email: "hello@newco.com".to_string(),
        phone: "03-5551234".to_string(),
        status: None,
    });
    core.update_customer(
        &customer.id,
        CustomerUpdate {
            tags: Some(vec!["Trial".to_string()]),
            ..CustomerUpdate::default()
        },
    )
    .expect("customer exists");
    let note = core
        .add_customer_note(&customer.id, "kickoff call done")
        .expect("note");
    let reloaded = core.customer_by_id(&customer.id).expect("customer");
    assert_eq!(reloaded.tags, vec!["Trial".to_string()]);
    assert_eq!(reloaded.notes.len(), 1);
    assert_eq!(reloaded.notes[0].id, note.id);

    // Ticket creation feeds the dashboard rollup.
    core.add_ticket(NewTicket {
        user: "New Co".to_string(),
        issue: "cannot export".to_string(),
        priority: Priority::Medium,
    });
    let stats = core.dashboard_stats();
    assert_eq!(stats.total_leads, 1);
    assert_eq!(stats.leads_by_status.get("converted"), Some(&1));
    assert_eq!(stats.total_customers, 3);
    assert_eq!(stats.open_tickets, 2);
}

#[test]
fn state_survives_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let core = open_core(&dir);
        core.add_lead(NewLead {
            name: "Persisted".to_string(),
            email: "p@x.com".to_string(),
            company: "X".to_string(),
            status: None,
            source: "web".to_string(),
            assigned_to: "dana".to_string(),
            avatar: None,
        });
        core.sign_in(SignInPayload {
            email: "admin@waterberry.app".to_string(),
            password: "waterberry-local".to_string(),
        });
    }

    let reopened = open_core(&dir);
    assert_eq!(reopened.leads().len(), 1);
    assert_eq!(reopened.leads()[0].name, "Persisted");
    assert!(reopened.session_status().authenticated);
}

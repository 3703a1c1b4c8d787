//! Behavioural guarantees of the sandbox runtime, exercised end to end
//! through the run driver and the public building blocks.

use std::sync::Arc;
use std::time::Duration;

use autolab_common::{ActionKind, ApiStyle, Catalog, LabConfig, RecorderConfig};
use autolab_sandbox::api::Runtime;
use autolab_sandbox::script::{compile, Interpreter};
use autolab_sandbox::{resolve_mock_response, CommandBus, FailureKind, Lab, Role, RunOutcome, TraceRecorder};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};

fn lab(scenario: &str, style: ApiStyle) -> Lab {
    let config = LabConfig {
        seed: Some(42),
        ..LabConfig::default()
    };
    let mut lab = Lab::new(Catalog::builtin().unwrap(), config);
    lab.select(scenario).unwrap();
    lab.set_style(style).unwrap();
    lab
}

fn key_set(value: &Value) -> Vec<String> {
    value
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn login_script_records_three_steps_in_order() {
    let mut lab = lab("basic-auth", ApiStyle::Playwright);
    let report = lab
        .run(
            "await page.goto('/x'); await page.getByLabel('Username').fill('u'); \
             await page.getByRole('button',{name:'Sign In'}).click();",
        )
        .await;

    assert!(report.outcome.is_success(), "{:?}", report.outcome);
    let steps = &report.steps;
    assert_eq!(steps.len(), 3);

    assert_eq!(steps[0].action, ActionKind::Navigate);
    assert_eq!(steps[0].value.as_deref(), Some("/x"));
    assert_eq!(steps[1].action, ActionKind::Fill);
    assert_eq!(steps[1].label.as_deref(), Some("Username"));
    assert_eq!(steps[1].value.as_deref(), Some("u"));
    assert_eq!(steps[2].action, ActionKind::Click);
    assert_eq!(steps[2].label.as_deref(), Some("Sign In"));

    assert_eq!(steps[0].elapsed_ms, 0);
    assert_eq!(steps[1].elapsed_ms, 500);
    assert_eq!(steps[2].elapsed_ms, 800);
}

#[tokio::test(start_paused = true)]
async fn steps_follow_source_order() {
    let mut lab = lab("inter-table-data", ApiStyle::Playwright);
    let report = lab
        .run(
            "test('order', async ({ page }) => {\n\
               await page.goto('/playground/table-data');\n\
               const row = page.locator('tr').filter({ hasText: 'Charlie' });\n\
               await expect(row.locator('.status-badge')).toContainText('Active');\n\
               await row.getByRole('button', { name: 'View' }).click();\n\
               await page.locator('#a').dragTo(page.locator('#b'));\n\
               await page.setInputFiles('#file', 'docs/report.pdf');\n\
             });",
        )
        .await;

    let kinds: Vec<ActionKind> = report.steps.iter().map(|s| s.action).collect();
    assert_eq!(
        kinds,
        vec![
            ActionKind::Navigate,
            ActionKind::AssertText,
            ActionKind::Click,
            ActionKind::Drag,
            ActionKind::Upload,
        ]
    );
    for pair in report.steps.windows(2) {
        assert!(pair[0].elapsed_ms <= pair[1].elapsed_ms);
        assert!(pair[0].index < pair[1].index);
    }
    assert_eq!(report.steps[4].value.as_deref(), Some("report.pdf"));
}

#[tokio::test(start_paused = true)]
async fn second_run_sees_none_of_the_first() {
    let mut lab = lab("basic-auth", ApiStyle::Playwright);
    let first = lab
        .run("await page.goto('/one'); await page.getByLabel('Username').fill('a');")
        .await;
    assert_eq!(first.steps.len(), 2);

    lab.select("basic-dropdowns").unwrap();
    let second = lab
        .run("await page.locator('#framework-select').selectOption('cypress');")
        .await;
    assert_eq!(second.steps.len(), 1);
    assert_eq!(second.steps[0].action, ActionKind::Select);
    assert!(second.steps.iter().all(|s| s.value.as_deref() != Some("/one")));
    assert!(lab.environment().render().contains("Selected: Cypress"));
}

#[tokio::test(start_paused = true)]
async fn superseded_run_cannot_write_into_the_new_trace() {
    let bus = CommandBus::new();
    let recorder = TraceRecorder::new(RecorderConfig::default(), StdRng::seed_from_u64(1));
    bus.subscribe(Role::Recorder, Arc::new(recorder.clone()));

    let stale_token = bus.begin_run();
    let stale = Interpreter::new(Runtime::new(
        bus.clone(),
        stale_token,
        ApiStyle::Playwright,
        Default::default(),
        StdRng::seed_from_u64(2),
    ));
    let stale_program = compile("await page.goto('/old'); await page.getByLabel('Old').click();").unwrap();

    let supersede = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let token = bus.begin_run();
        recorder.reset();
        let fresh = Interpreter::new(Runtime::new(
            bus.clone(),
            token,
            ApiStyle::Playwright,
            Default::default(),
            StdRng::seed_from_u64(3),
        ));
        let program = compile("await page.getByLabel('New').fill('x');").unwrap();
        fresh.run(&program).await
    };

    let (stale_result, fresh_result) = tokio::join!(stale.run(&stale_program), supersede);
    assert!(stale_result.is_ok());
    assert!(fresh_result.is_ok());

    let steps = recorder.steps();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].label.as_deref(), Some("New"));
}

#[tokio::test(start_paused = true)]
async fn nested_frames_extend_their_parent() {
    let mut lab = lab("advanced-nested-iframe", ApiStyle::Playwright);
    let report = lab
        .run(
            "const outer = page.frameLocator('#outer-iframe');\n\
             const inner = outer.frameLocator('#inner-iframe');\n\
             await inner.getByRole('button', { name: 'Submit Inner' }).click();\n\
             await outer.getByText('Outer Iframe Body').click();",
        )
        .await;

    assert_eq!(report.steps[0].frame_path.segments(), ["#outer-iframe", "#inner-iframe"]);
    assert_eq!(report.steps[1].frame_path.segments(), ["#outer-iframe"]);
    assert!(!report.steps[1].frame_path.mentions("inner"));
}

#[tokio::test(start_paused = true)]
async fn chained_frames_nest_in_cypress() {
    let mut lab = lab("advanced-nested-iframe", ApiStyle::Cypress);
    let report = lab
        .run(
            "cy.get('#outer-iframe').its('0.contentDocument.body').then(cy.wrap)\n\
               .find('#inner-iframe').its('0.contentDocument.body').then(cy.wrap)\n\
               .find('button').click();\n\
             cy.get('#outer-iframe').its('0.contentDocument.body').find('p').click();",
        )
        .await;

    assert!(report.outcome.is_success(), "{:?}", report.outcome);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].frame_path.segments(), ["#outer-iframe", "#inner-iframe"]);
    assert_eq!(report.steps[1].frame_path.segments(), ["#outer-iframe"]);
}

#[test]
fn responses_only_vary_in_random_fields() {
    let body = json!({"name": "Ada"});
    for (method, url, payload) in [
        ("POST", "/api/auth/token", Some(&body)),
        ("POST", "/api/items", Some(&body)),
        ("GET", "/api/users/1", None),
    ] {
        let a = resolve_mock_response(method, url, payload, &Map::new(), &[], &mut StdRng::seed_from_u64(1));
        let b = resolve_mock_response(method, url, payload, &Map::new(), &[], &mut StdRng::seed_from_u64(99));
        assert_eq!(a.status, b.status);
        assert_eq!(key_set(&a.body), key_set(&b.body));
    }
}

#[test]
fn secure_data_is_gated_on_the_exact_key() {
    let mut rng = StdRng::seed_from_u64(5);
    for (name, value, status) in [
        ("x-api-key", "top-secret-key-123", 200),
        ("X-API-KEY", "top-secret-key-123", 200),
        ("x-Api-Key", "top-secret-key-123", 200),
        ("x-api-key", "TOP-SECRET-KEY-123", 401),
        ("x-api-key", "", 401),
        ("authorization", "top-secret-key-123", 401),
    ] {
        let mut headers = Map::new();
        headers.insert(name.to_string(), json!(value));
        let response = resolve_mock_response("GET", "/api/secure-data", None, &headers, &[], &mut rng);
        assert_eq!(response.status, status, "{}: {}", name, value);
        if status == 200 {
            assert!(response.body["secret"].is_string());
        } else {
            assert!(response.body["error"].is_string());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn token_exchange_in_both_styles() {
    let scripts = [
        (
            ApiStyle::Playwright,
            "const r = await request.post('/api/auth/token', { data: { code: 'c' } });\n\
             const body = await r.json();\n\
             if (body.token_type !== 'Bearer') throw new Error('bad token type');",
        ),
        (
            ApiStyle::Cypress,
            "cy.request('POST', '/api/auth/token', { code: 'c' }).then((response) => {\n\
               if (response.body.expires_in !== 3600) throw new Error('bad expiry');\n\
             });",
        ),
    ];
    for (style, script) in scripts {
        let mut lab = lab("api-oauth-token", style);
        let report = lab.run(script).await;
        assert!(report.outcome.is_success(), "{}: {:?}", style, report.outcome);

        let network = report.steps[0].network.clone().unwrap();
        assert_eq!(network.method, "POST");
        assert_eq!(network.status, 200);
        assert_eq!(network.response["token_type"], "Bearer");
        assert_eq!(network.response["expires_in"], 3600);
        assert!(!network.response["access_token"].as_str().unwrap().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn interception_overrides_the_default_response() {
    let scripts = [
        (
            ApiStyle::Playwright,
            "await page.route('**/api/data', route => route.fulfill({ status: 500, body: JSON.stringify({ error: 'boom' }) }));\n\
             const r = await request.get('/api/data');\n\
             console.log(r.status());",
        ),
        (
            ApiStyle::Cypress,
            "cy.intercept('GET', '**/api/data', { statusCode: 500, body: { error: 'boom' } });\n\
             cy.request('/api/data').its('status').then((status) => console.log(status));",
        ),
    ];
    for (style, script) in scripts {
        let mut lab = lab("adv-api-mocking", style);
        let report = lab.run(script).await;
        assert!(report.outcome.is_success(), "{}: {:?}", style, report.outcome);

        assert_eq!(report.steps[0].action, ActionKind::RouteIntercept);
        let network = report.steps[1].network.clone().unwrap();
        assert_eq!(network.status, 500);
        assert_eq!(network.response, json!({"error": "boom"}));
        assert_eq!(report.console, vec!["500".to_string()]);
    }
}

#[tokio::test(start_paused = true)]
async fn throwing_stops_the_trace_and_reports_the_message() {
    let mut lab = lab("basic-auth", ApiStyle::Playwright);
    let report = lab
        .run(
            "test('fails', async ({ page }) => {\n\
               await page.goto('/playground/login');\n\
               throw new Error('kaboom');\n\
               await page.getByLabel('Username').fill('never');\n\
             });",
        )
        .await;

    assert_eq!(report.steps.len(), 1);
    match &report.outcome {
        RunOutcome::Failed { kind, message } => {
            assert_eq!(*kind, FailureKind::Execution);
            assert!(message.contains("kaboom"));
        }
        RunOutcome::Success => panic!("run should have failed"),
    }
    assert!(report.outcome.banner().starts_with("Execution Error: kaboom"));
}

#[tokio::test(start_paused = true)]
async fn unknown_api_method_is_an_execution_error() {
    let mut lab = lab("basic-auth", ApiStyle::Cypress);
    let report = lab.run("cy.visit('/'); cy.teleport('#x');").await;
    assert_eq!(report.steps.len(), 1);
    assert_eq!(
        report.outcome,
        RunOutcome::Failed {
            kind: FailureKind::Execution,
            message: "cy.teleport is not a function".to_string(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn wrapper_without_callback_is_rejected() {
    let mut lab = lab("basic-auth", ApiStyle::Playwright);
    let report = lab.run("test('missing');").await;
    match report.outcome {
        RunOutcome::Failed { message, .. } => assert!(message.contains("requires a callback")),
        RunOutcome::Success => panic!("run should have failed"),
    }
}

#[tokio::test(start_paused = true)]
async fn value_matchers_pass_without_recording() {
    let mut lab = lab("basic-auth", ApiStyle::Playwright);
    let report = lab
        .run(
            "const x = { a: 1 };\n\
             expect(1).toBe(2);\n\
             expect(true).toBeTruthy();\n\
             expect(x).toBeDefined();\n\
             expect(x.a).not.toEqual(1);\n\
             expect('abc').toContain('z');",
        )
        .await;

    assert!(report.outcome.is_success(), "{:?}", report.outcome);
    assert!(report.steps.is_empty());
}

#[tokio::test(start_paused = true)]
async fn visibility_checks_add_no_delay() {
    let mut lab = lab("basic-auth", ApiStyle::Playwright);
    let report = lab
        .run(
            "await page.goto('/login');\n\
             await expect(page.getByLabel('Username')).toBeVisible();\n\
             await page.getByLabel('Password').toBeVisible();\n\
             await page.getByLabel('Username').fill('u');\n\
             await page.getByLabel('Password').fill('p');",
        )
        .await;

    assert!(report.outcome.is_success(), "{:?}", report.outcome);
    let kinds: Vec<ActionKind> = report.steps.iter().map(|s| s.action).collect();
    assert_eq!(
        kinds,
        vec![
            ActionKind::Navigate,
            ActionKind::AssertVisible,
            ActionKind::AssertVisible,
            ActionKind::Fill,
            ActionKind::Fill,
        ]
    );
    let elapsed: Vec<u64> = report.steps.iter().map(|s| s.elapsed_ms).collect();
    assert_eq!(elapsed, vec![0, 500, 500, 500, 800]);
}

#[tokio::test(start_paused = true)]
async fn oversized_strings_fail_the_run() {
    let scripts = [
        ("const s = 'x'.repeat(Infinity);", "Invalid count value: Infinity"),
        ("const s = 'x'.repeat(-1);", "Invalid count value: -1"),
        ("const s = 'ab'.repeat(1e12);", "Invalid string length"),
        ("const s = '7'.padStart(1e12, '0');", "Invalid string length"),
    ];
    for (script, expected) in scripts {
        let mut lab = lab("basic-auth", ApiStyle::Playwright);
        let report = lab.run(script).await;
        match &report.outcome {
            RunOutcome::Failed { kind, message } => {
                assert_eq!(*kind, FailureKind::Execution);
                assert!(message.contains(expected), "{}: {}", script, message);
            }
            other => panic!("{} should fail, got {:?}", script, other),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn promise_all_keeps_source_order() {
    let mut lab = lab("adv-api-mocking", ApiStyle::Playwright);
    let report = lab
        .run(
            "test('mock', async ({ page }) => {\n\
               await page.route('**/api/data', route => route.fulfill({ status: 500, body: JSON.stringify({ error: 'down' }) }));\n\
               await page.goto('/playground/api-mock');\n\
               const [response] = await Promise.all([\n\
                 page.waitForResponse('**/api/data'),\n\
                 page.getByRole('button', { name: 'Fetch Data' }).click(),\n\
               ]);\n\
               console.log(response.status());\n\
               const same = await Promise.resolve(7);\n\
               console.log(same);\n\
             });",
        )
        .await;

    assert!(report.outcome.is_success(), "{:?}", report.outcome);
    let kinds: Vec<ActionKind> = report.steps.iter().map(|s| s.action).collect();
    assert_eq!(kinds, vec![ActionKind::RouteIntercept, ActionKind::Navigate, ActionKind::Click]);
    assert_eq!(report.console, vec!["500".to_string(), "7".to_string()]);
    assert!(lab.environment().render().contains("Error: down"));
}

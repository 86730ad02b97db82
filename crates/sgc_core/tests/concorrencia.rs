mod common;

use common::{chefe, gestor, Cenario, SESEL};
use sgc_core::db::open_db;
use sgc_core::repo::subprocesso_repo::{SqliteSubprocessoRepository, SubprocessoRepository};
use sgc_core::{LogMailer, SituacaoSubprocesso, TipoProcesso, WorkflowEngine, WorkflowResult};
use std::thread;

#[test]
fn state_update_with_a_stale_source_state_changes_nothing() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");
    cenario
        .engine()
        .disponibilizar_cadastro(sub.id, &chefe(SESEL))
        .unwrap();
    let subprocessos = SqliteSubprocessoRepository::try_new(&cenario.conn).unwrap();

    let aplicado = subprocessos
        .transicionar(
            sub.id,
            SituacaoSubprocesso::MapeamentoCadastroEmAndamento,
            SituacaoSubprocesso::MapeamentoCadastroHomologado,
        )
        .unwrap();

    assert!(!aplicado);
    assert_eq!(
        cenario.atual(sub.id).situacao,
        SituacaoSubprocesso::MapeamentoCadastroDisponibilizado
    );
    assert!(subprocessos
        .transicionar(
            sub.id,
            SituacaoSubprocesso::MapeamentoCadastroDisponibilizado,
            SituacaoSubprocesso::MapeamentoCadastroHomologado,
        )
        .unwrap());
}

#[test]
fn writer_on_another_connection_sees_the_committed_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sgc.db");
    let cenario = Cenario::em_arquivo(&path);
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");

    let outra = open_db(&path).unwrap();
    let engine_outra = WorkflowEngine::try_new(&outra, LogMailer, &cenario.config).unwrap();
    cenario
        .engine()
        .disponibilizar_cadastro(sub.id, &chefe(SESEL))
        .unwrap();

    let err = engine_outra
        .disponibilizar_cadastro(sub.id, &chefe(SESEL))
        .unwrap_err();

    assert_eq!(err.http_status(), 409);
    assert_eq!(cenario.movimentacoes(sub.id).len(), 2);
}

#[test]
fn concurrent_acceptances_let_exactly_one_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sgc.db");
    let cenario = Cenario::em_arquivo(&path);
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");
    cenario
        .engine()
        .disponibilizar_cadastro(sub.id, &chefe(SESEL))
        .unwrap();

    let resultados: Vec<WorkflowResult<_>> = thread::scope(|escopo| {
        let tarefas: Vec<_> = (0..2)
            .map(|_| {
                escopo.spawn(|| {
                    let conn = open_db(&path).unwrap();
                    let engine = WorkflowEngine::try_new(&conn, LogMailer, &cenario.config).unwrap();
                    engine.aceitar_cadastro(sub.id, None, &gestor())
                })
            })
            .collect();
        tarefas
            .into_iter()
            .map(|tarefa| tarefa.join().unwrap())
            .collect()
    });

    assert_eq!(resultados.iter().filter(|resultado| resultado.is_ok()).count(), 1);
    let perdedor = resultados
        .into_iter()
        .find_map(Result::err)
        .unwrap();
    assert_eq!(perdedor.http_status(), 409);
    assert_eq!(cenario.movimentacoes(sub.id).len(), 3);
}

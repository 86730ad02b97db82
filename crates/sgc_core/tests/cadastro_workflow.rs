mod common;

use common::{admin, chefe, gestor, servidor, Cenario, FailingMailer, COORD, PRAZO, SEDOC, SEJUD, SECRE, SENIC, SESEL};
use sgc_core::model::registro::AcaoAnalise;
use sgc_core::{Perfil, SituacaoSubprocesso, TipoProcesso, UsuarioAtivo, WorkflowEngine, WorkflowError};
use uuid::Uuid;

#[test]
fn first_activity_starts_cadastro_without_new_movement() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);

    assert_eq!(sub.situacao, SituacaoSubprocesso::NaoIniciado);
    assert_eq!(sub.data_limite_etapa1, PRAZO);
    let movimentacoes = cenario.movimentacoes(sub.id);
    assert_eq!(movimentacoes.len(), 1);
    assert_eq!(movimentacoes[0].descricao, "Processo iniciado");
    assert_eq!(movimentacoes[0].unidade_origem, None);
    assert_eq!(movimentacoes[0].unidade_destino, SESEL);

    cenario
        .mapas()
        .criar_atividade(sub.id, "Analisar editais", &chefe(SESEL))
        .unwrap();

    assert_eq!(
        cenario.atual(sub.id).situacao,
        SituacaoSubprocesso::MapeamentoCadastroEmAndamento
    );
    assert_eq!(cenario.movimentacoes(sub.id).len(), 1);
}

#[test]
fn disponibilizar_moves_to_parent_with_one_alert_and_superior_emails() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");

    let atualizado = cenario
        .engine()
        .disponibilizar_cadastro(sub.id, &chefe(SESEL))
        .unwrap();

    assert_eq!(
        atualizado.situacao,
        SituacaoSubprocesso::MapeamentoCadastroDisponibilizado
    );
    assert!(cenario.atual(sub.id).data_fim_etapa1.is_some());

    let movimentacoes = cenario.movimentacoes(sub.id);
    assert_eq!(movimentacoes.len(), 2);
    assert_eq!(movimentacoes[0].unidade_origem, Some(SESEL));
    assert_eq!(movimentacoes[0].unidade_destino, COORD);
    assert_eq!(
        movimentacoes[0].descricao,
        "Disponibilização do cadastro de atividades"
    );

    let alertas_coord: Vec<_> = cenario
        .engine()
        .listar_alertas(&gestor())
        .unwrap()
        .into_iter()
        .filter(|alerta| alerta.descricao.contains("disponibilizado para análise"))
        .collect();
    assert_eq!(alertas_coord.len(), 1);
    assert_eq!(alertas_coord[0].unidade_origem, Some(SESEL));
    assert_eq!(
        alertas_coord[0].descricao,
        "Cadastro de atividades da unidade SESEL disponibilizado para análise"
    );

    let mut destinatarios = cenario.mailer.destinatarios();
    destinatarios.sort();
    assert_eq!(
        destinatarios,
        vec!["coord@tre-pe.jus.br".to_string(), "sedoc@tre-pe.jus.br".to_string()]
    );
}

#[test]
fn disponibilizar_lists_every_activity_without_knowledge() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    let mapas = cenario.mapas();
    cenario.preencher_cadastro(&sub, "Analisar editais");
    mapas.criar_atividade(sub.id, "Publicar avisos", &chefe(SESEL)).unwrap();
    mapas.criar_atividade(sub.id, "Arquivar atas", &chefe(SESEL)).unwrap();

    let err = cenario
        .engine()
        .disponibilizar_cadastro(sub.id, &chefe(SESEL))
        .unwrap_err();

    assert_eq!(err.http_status(), 422);
    let details = err.details().unwrap();
    assert_eq!(
        details["atividadesSemConhecimento"],
        vec!["Publicar avisos".to_string(), "Arquivar atas".to_string()]
    );
    assert_eq!(
        cenario.atual(sub.id).situacao,
        SituacaoSubprocesso::MapeamentoCadastroEmAndamento
    );
    assert_eq!(cenario.movimentacoes(sub.id).len(), 1);
    assert!(cenario.mailer.enviados.borrow().is_empty());
}

#[test]
fn removing_the_only_activity_keeps_state_but_blocks_submission() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    let mapas = cenario.mapas();
    let atividade = mapas
        .criar_atividade(sub.id, "Analisar editais", &chefe(SESEL))
        .unwrap();

    mapas.remover_atividade(sub.id, atividade.id, &chefe(SESEL)).unwrap();

    assert_eq!(
        cenario.atual(sub.id).situacao,
        SituacaoSubprocesso::MapeamentoCadastroEmAndamento
    );
    let err = cenario
        .engine()
        .disponibilizar_cadastro(sub.id, &chefe(SESEL))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation { .. }));
}

#[test]
fn homologar_outside_disponibilizado_is_a_state_conflict() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);

    let err = cenario
        .engine()
        .homologar_cadastro(sub.id, None, &admin())
        .unwrap_err();
    assert_eq!(err.http_status(), 409);

    cenario.preencher_cadastro(&sub, "Analisar editais");
    let err = cenario
        .engine()
        .homologar_cadastro(sub.id, None, &admin())
        .unwrap_err();
    assert!(matches!(err, WorkflowError::StateConflict(_)));
    assert_eq!(cenario.movimentacoes(sub.id).len(), 1);
}

#[test]
fn wrong_profile_or_wrong_unit_is_forbidden_and_unknown_id_is_not_found() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");
    let engine = cenario.engine();

    let err = engine.disponibilizar_cadastro(sub.id, &chefe(SENIC)).unwrap_err();
    assert_eq!(err.http_status(), 403);
    engine.disponibilizar_cadastro(sub.id, &chefe(SESEL)).unwrap();

    let err = engine.aceitar_cadastro(sub.id, None, &chefe(SESEL)).unwrap_err();
    assert_eq!(err.http_status(), 403);
    // ADMIN skips the profile list, not the owning-unit rule.
    let err = engine.aceitar_cadastro(sub.id, None, &admin()).unwrap_err();
    assert!(matches!(err, WorkflowError::Forbidden(_)));

    let err = engine
        .aceitar_cadastro(Uuid::new_v4(), None, &gestor())
        .unwrap_err();
    assert_eq!(err.http_status(), 404);

    engine.aceitar_cadastro(sub.id, Some("De acordo"), &gestor()).unwrap();
    assert_eq!(cenario.movimentacoes(sub.id)[0].unidade_destino, SEDOC);
}

#[test]
fn devolution_then_resubmission_purges_analyses_but_keeps_movements() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");
    let engine = cenario.engine();

    engine.disponibilizar_cadastro(sub.id, &chefe(SESEL)).unwrap();
    engine.aceitar_cadastro(sub.id, None, &gestor()).unwrap();
    let devolvido = engine
        .devolver_cadastro(sub.id, "Faltam conhecimentos", &admin())
        .unwrap();

    assert_eq!(
        devolvido.situacao,
        SituacaoSubprocesso::MapeamentoCadastroEmAndamento
    );
    assert_eq!(cenario.atual(sub.id).data_fim_etapa1, None);
    let historico = engine.historico_cadastro(sub.id, &admin()).unwrap();
    assert_eq!(historico.len(), 2);
    assert_eq!(historico[0].acao, AcaoAnalise::Devolucao);
    assert_eq!(historico[0].unidade, SEDOC);
    assert_eq!(historico[0].observacoes.as_deref(), Some("Faltam conhecimentos"));
    assert_eq!(historico[1].acao, AcaoAnalise::Aceite);
    assert_eq!(historico[1].unidade, COORD);

    let ultima = &cenario.movimentacoes(sub.id)[0];
    assert_eq!(ultima.unidade_origem, Some(SEDOC));
    assert_eq!(ultima.unidade_destino, SESEL);
    let alertas = engine.listar_alertas(&chefe(SESEL)).unwrap();
    assert!(alertas[0]
        .descricao
        .ends_with("devolvido para ajustes. Justificativa: Faltam conhecimentos"));

    engine.disponibilizar_cadastro(sub.id, &chefe(SESEL)).unwrap();
    assert!(engine.historico_cadastro(sub.id, &admin()).unwrap().is_empty());
    assert_eq!(cenario.movimentacoes(sub.id).len(), 5);
}

#[test]
fn devolution_requires_a_justification() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");
    cenario
        .engine()
        .disponibilizar_cadastro(sub.id, &chefe(SESEL))
        .unwrap();

    let err = cenario
        .engine()
        .devolver_cadastro(sub.id, "   ", &gestor())
        .unwrap_err();

    assert_eq!(err.http_status(), 422);
    assert!(err.details().unwrap().contains_key("justificativa"));
    assert_eq!(
        cenario.atual(sub.id).situacao,
        SituacaoSubprocesso::MapeamentoCadastroDisponibilizado
    );
}

#[test]
fn homologation_is_recorded_at_the_root() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);

    cenario.homologar_cadastro(&sub);

    assert_eq!(
        cenario.atual(sub.id).situacao,
        SituacaoSubprocesso::MapeamentoCadastroHomologado
    );
    let ultima = &cenario.movimentacoes(sub.id)[0];
    assert_eq!(ultima.unidade_origem, Some(SEDOC));
    assert_eq!(ultima.unidade_destino, SEDOC);
    assert_eq!(ultima.descricao, "Cadastro de atividades e conhecimentos homologado");
}

#[test]
fn approvals_climb_through_intermediate_units() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SEJUD]);
    let sub = cenario.subprocesso(&processo, SEJUD);
    cenario.preencher_cadastro(&sub, "Julgar recursos");
    let engine = cenario.engine();
    let gestor_secre = UsuarioAtivo::new("500", Perfil::Gestor, SECRE);

    engine.disponibilizar_cadastro(sub.id, &chefe(SEJUD)).unwrap();
    assert_eq!(cenario.movimentacoes(sub.id)[0].unidade_destino, SECRE);

    let err = engine.aceitar_cadastro(sub.id, None, &gestor()).unwrap_err();
    assert_eq!(err.http_status(), 403);
    engine.aceitar_cadastro(sub.id, None, &gestor_secre).unwrap();
    let ultima = &cenario.movimentacoes(sub.id)[0];
    assert_eq!(ultima.unidade_origem, Some(SECRE));
    assert_eq!(ultima.unidade_destino, SEDOC);

    engine.homologar_cadastro(sub.id, None, &admin()).unwrap();
}

#[test]
fn reopening_alerts_owner_and_ancestors_and_checks_process_type() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.homologar_cadastro(&sub);
    let engine = cenario.engine();

    let err = engine
        .reabrir_revisao_cadastro(sub.id, "Erro material", &admin())
        .unwrap_err();
    assert_eq!(err.http_status(), 422);
    let err = engine
        .reabrir_cadastro(sub.id, "Erro material", &gestor())
        .unwrap_err();
    assert_eq!(err.http_status(), 403);
    let err = engine.reabrir_cadastro(sub.id, "", &admin()).unwrap_err();
    assert_eq!(err.http_status(), 422);

    let reaberto = engine
        .reabrir_cadastro(sub.id, "Erro material", &admin())
        .unwrap();

    assert_eq!(
        reaberto.situacao,
        SituacaoSubprocesso::MapeamentoCadastroEmAndamento
    );
    assert_eq!(cenario.atual(sub.id).data_fim_etapa1, None);
    let ultima = &cenario.movimentacoes(sub.id)[0];
    assert_eq!(ultima.descricao, "Reabertura de cadastro");
    assert_eq!(ultima.unidade_origem, Some(SEDOC));
    assert_eq!(ultima.unidade_destino, SESEL);
    for ator in [chefe(SESEL), gestor(), admin()] {
        let reabertos = engine
            .listar_alertas(&ator)
            .unwrap()
            .into_iter()
            .filter(|alerta| alerta.descricao.contains("reaberto"))
            .count();
        assert_eq!(reabertos, 1, "unit {}", ator.unidade_ativa);
    }
}

#[test]
fn changing_the_deadline_alerts_the_unit_without_movement() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    // 2030-03-01T00:00:00Z
    let nova_data = 1_898_553_600_000;

    let err = cenario
        .engine()
        .alterar_data_limite(sub.id, nova_data, &chefe(SESEL))
        .unwrap_err();
    assert_eq!(err.http_status(), 403);

    let atualizado = cenario
        .engine()
        .alterar_data_limite(sub.id, nova_data, &admin())
        .unwrap();

    assert_eq!(atualizado.situacao, SituacaoSubprocesso::NaoIniciado);
    assert_eq!(cenario.atual(sub.id).data_limite_etapa1, nova_data);
    assert_eq!(cenario.movimentacoes(sub.id).len(), 1);
    let alertas = cenario.engine().listar_alertas(&chefe(SESEL)).unwrap();
    assert_eq!(alertas[0].descricao, "Data limite da etapa 1 alterada para 01/03/2030");
    let enviados = cenario.mailer.enviados.borrow();
    assert_eq!(enviados.len(), 1);
    assert_eq!(enviados[0].destinatario, "sesel@tre-pe.jus.br");
}

#[test]
fn reads_are_scoped_by_hierarchy() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    let engine = cenario.engine();

    assert!(engine.obter_subprocesso(sub.id, &servidor(SESEL)).is_ok());
    assert!(engine.obter_subprocesso(sub.id, &gestor()).is_ok());
    let err = engine.obter_subprocesso(sub.id, &chefe(SENIC)).unwrap_err();
    assert_eq!(err.http_status(), 403);
    let err = engine.listar_movimentacoes(sub.id, &chefe(SENIC)).unwrap_err();
    assert_eq!(err.http_status(), 403);
}

#[test]
fn admin_below_the_root_cannot_homologate() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");
    let engine = cenario.engine();
    let admin_coord = UsuarioAtivo::new("100", Perfil::Admin, COORD);
    engine.disponibilizar_cadastro(sub.id, &chefe(SESEL)).unwrap();

    let err = engine
        .homologar_cadastro(sub.id, None, &admin_coord)
        .unwrap_err();

    assert_eq!(err.http_status(), 403);
    assert_eq!(
        cenario.atual(sub.id).situacao,
        SituacaoSubprocesso::MapeamentoCadastroDisponibilizado
    );
    assert_eq!(cenario.movimentacoes(sub.id).len(), 2);
    assert!(engine.historico_cadastro(sub.id, &admin()).unwrap().is_empty());

    engine.aceitar_cadastro(sub.id, None, &gestor()).unwrap();
    engine.homologar_cadastro(sub.id, None, &admin()).unwrap();
}

#[test]
fn repeated_acceptance_from_the_same_tier_is_a_conflict() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");
    let engine = cenario.engine();
    engine.disponibilizar_cadastro(sub.id, &chefe(SESEL)).unwrap();
    engine.aceitar_cadastro(sub.id, None, &gestor()).unwrap();

    let err = engine.aceitar_cadastro(sub.id, None, &gestor()).unwrap_err();

    assert_eq!(err.http_status(), 409);
    assert!(matches!(err, WorkflowError::StateConflict(_)));
    assert_eq!(cenario.movimentacoes(sub.id).len(), 3);
    assert_eq!(engine.historico_cadastro(sub.id, &admin()).unwrap().len(), 1);
}

#[test]
fn mail_failure_keeps_the_committed_transition() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);
    let sub = cenario.subprocesso(&processo, SESEL);
    cenario.preencher_cadastro(&sub, "Analisar editais");
    let fora_do_ar = FailingMailer::default();
    let engine = WorkflowEngine::try_new(&cenario.conn, &fora_do_ar, &cenario.config).unwrap();

    let atualizado = engine.disponibilizar_cadastro(sub.id, &chefe(SESEL)).unwrap();

    assert_eq!(
        atualizado.situacao,
        SituacaoSubprocesso::MapeamentoCadastroDisponibilizado
    );
    assert_eq!(fora_do_ar.tentativas.get(), 2);
    assert_eq!(
        cenario.atual(sub.id).situacao,
        SituacaoSubprocesso::MapeamentoCadastroDisponibilizado
    );
    let ultima = &cenario.movimentacoes(sub.id)[0];
    assert_eq!(ultima.unidade_origem, Some(SESEL));
    assert_eq!(ultima.unidade_destino, COORD);
    let alertas = engine.listar_alertas(&gestor()).unwrap();
    assert!(alertas
        .iter()
        .any(|alerta| alerta.descricao
            == "Cadastro de atividades da unidade SESEL disponibilizado para análise"));
    assert!(cenario.mailer.enviados.borrow().is_empty());
}
